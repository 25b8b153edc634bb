use std::collections::BTreeMap;

use parking_lot::RwLock;

use crate::Result;

/// A synchronous key-value store with ordered prefix scans
///
/// This is the single source of truth for TXO records and wallet blobs. The
/// trait is deliberately tiny: the wallet only ever gets, puts, and
/// range-scans under a prefix.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;

    fn put(&self, key: &[u8], value: &[u8]) -> Result<()>;

    fn delete(&self, key: &[u8]) -> Result<()>;

    /// All `(key, value)` pairs whose key starts with `prefix`, in key order
    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>>;
}

/// An in-memory [`KeyValueStore`]
///
/// The default backend for tests and short-lived wallets.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.entries.write().insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &[u8]) -> Result<()> {
        self.entries.write().remove(key);
        Ok(())
    }

    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        let entries = self.entries.read();
        Ok(entries
            .range(prefix.to_vec()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_operations() {
        let store = MemoryStore::new();

        assert_eq!(store.get(b"a").unwrap(), None);

        store.put(b"a", b"1").unwrap();
        assert_eq!(store.get(b"a").unwrap(), Some(b"1".to_vec()));

        store.delete(b"a").unwrap();
        assert_eq!(store.get(b"a").unwrap(), None);
    }

    #[test]
    fn prefix_scan_is_ordered_and_bounded() {
        let store = MemoryStore::new();

        store.put(b"txo:1:a", b"1").unwrap();
        store.put(b"txo:1:b", b"2").unwrap();
        store.put(b"txo:2:a", b"3").unwrap();
        store.put(b"wallet:1", b"4").unwrap();

        let scanned = store.scan_prefix(b"txo:1:").unwrap();
        assert_eq!(scanned.len(), 2);
        assert_eq!(scanned[0].0, b"txo:1:a".to_vec());
        assert_eq!(scanned[1].0, b"txo:1:b".to_vec());
    }
}
