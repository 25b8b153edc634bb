use std::path::Path;

use rocksdb::{Direction, IteratorMode, DB};

use crate::{KeyValueStore, Result};

/// A RocksDB-backed [`KeyValueStore`]
pub struct RocksStore {
    db: DB,
}

impl RocksStore {
    /// Open (or create) a database at `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut options = rocksdb::Options::default();
        options.create_if_missing(true);

        let db = DB::open(&options, path)?;
        Ok(Self { db })
    }
}

impl KeyValueStore for RocksStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.db.get(key)?)
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.db.put(key, value)?;
        Ok(())
    }

    fn delete(&self, key: &[u8]) -> Result<()> {
        self.db.delete(key)?;
        Ok(())
    }

    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        let mode = IteratorMode::From(prefix, Direction::Forward);

        let mut entries = Vec::new();
        for item in self.db.iterator(mode) {
            let (key, value) = item?;
            if !key.starts_with(prefix) {
                break;
            }
            entries.push((key.to_vec(), value.to_vec()));
        }

        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use tempdir::TempDir;

    use super::*;

    #[test]
    fn rocks_roundtrip() {
        let dir = TempDir::new("rg-store-test").unwrap();
        let store = RocksStore::open(dir.path()).unwrap();

        store.put(b"txo:a:1", b"one").unwrap();
        store.put(b"txo:a:2", b"two").unwrap();
        store.put(b"txo:b:1", b"other").unwrap();

        assert_eq!(store.get(b"txo:a:1").unwrap(), Some(b"one".to_vec()));

        let scanned = store.scan_prefix(b"txo:a:").unwrap();
        assert_eq!(scanned.len(), 2);

        store.delete(b"txo:a:1").unwrap();
        assert_eq!(store.get(b"txo:a:1").unwrap(), None);
    }
}
