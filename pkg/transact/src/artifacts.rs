//! Loading of compiled circuit artifacts
//!
//! Each circuit ships as a `.wasm` witness generator and a `.zkey` proving
//! key from the trusted setup, looked up by circuit name inside one
//! directory. Artifacts are large and immutable, so they are read once and
//! cached.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::{CircuitKind, Error, Result};

/// The raw artifact bytes of one circuit
pub struct CircuitArtifacts {
    pub wasm: Vec<u8>,
    pub zkey: Vec<u8>,
}

/// A directory of circuit artifacts with an in-memory cache
pub struct ArtifactStore {
    dir: PathBuf,
    cache: RwLock<HashMap<&'static str, Arc<CircuitArtifacts>>>,
}

impl ArtifactStore {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Load (or fetch from cache) the artifacts of a circuit
    pub fn load(&self, circuit: CircuitKind) -> Result<Arc<CircuitArtifacts>> {
        let name = circuit.name();

        if let Some(artifacts) = self.cache.read().get(name) {
            return Ok(artifacts.clone());
        }

        let artifacts = Arc::new(CircuitArtifacts {
            wasm: self.read(&format!("{name}.wasm"))?,
            zkey: self.read(&format!("{name}.zkey"))?,
        });

        self.cache.write().insert(name, artifacts.clone());
        Ok(artifacts)
    }

    fn read(&self, file: &str) -> Result<Vec<u8>> {
        let path = self.dir.join(file);
        if !path.exists() {
            return Err(Error::CircuitNotFound(path.display().to_string()));
        }
        Ok(std::fs::read(path)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_artifacts_are_reported_by_path() {
        let store = ArtifactStore::new("/nonexistent/circuits");
        let err = store.load(CircuitKind::Erc20Small).unwrap_err();

        match err {
            Error::CircuitNotFound(path) => assert!(path.contains("erc20small.wasm")),
            other => panic!("unexpected error: {other}"),
        }
    }
}
