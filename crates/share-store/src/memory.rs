//! In-process share store backed by a `DashMap`, for tests and local/dev use.

use crate::{Result, ShareStore, StoreError};
use dashmap::DashMap;

/// In-memory `ShareStore`. Mirrors the broadcast/direct message maps in the
/// reference workspace's in-memory relay: a `DashMap` keyed by the logical
/// identifier, with `entry().or_insert` giving atomic create-if-absent.
#[derive(Default)]
pub struct MemoryShareStore {
    values: DashMap<String, String>,
}

impl MemoryShareStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ShareStore for MemoryShareStore {
    fn put(&self, key: &str, value: &str) -> Result<()> {
        use dashmap::mapref::entry::Entry;
        match self.values.entry(key.to_string()) {
            Entry::Occupied(_) => Err(StoreError::Conflict(key.to_string())),
            Entry::Vacant(slot) => {
                slot.insert(value.to_string());
                Ok(())
            }
        }
    }

    fn get(&self, key: &str) -> Result<String> {
        self.values
            .get(key)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_then_get_round_trips() {
        let store = MemoryShareStore::new();
        store.put("k", "v").unwrap();
        assert_eq!(store.get("k").unwrap(), "v");
    }

    #[test]
    fn put_is_create_if_absent() {
        let store = MemoryShareStore::new();
        store.put("k", "v1").unwrap();
        let err = store.put("k", "v2").unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        assert_eq!(store.get("k").unwrap(), "v1");
    }

    #[test]
    fn get_missing_is_not_found() {
        let store = MemoryShareStore::new();
        assert!(matches!(store.get("missing"), Err(StoreError::NotFound(_))));
    }
}
