//! File-backed share store.
//!
//! Stands in for a networked encrypted KV store during local development and
//! integration tests: one file per key, under a base directory, with the
//! key's slashes forming the directory structure (`hyperliquid/tss-shares/w1/share-2`
//! becomes `<base>/hyperliquid/tss-shares/w1/share-2`). Create-if-absent is
//! enforced by the filesystem itself via `OpenOptions::create_new`, so two
//! concurrent `put`s for the same key race at the OS level rather than in
//! this process.

use crate::{Result, ShareStore, StoreError};
use std::fs;
use std::io::{ErrorKind, Read, Write};
use std::path::PathBuf;

pub struct FileShareStore {
    base_dir: PathBuf,
}

impl FileShareStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.base_dir.join(key)
    }
}

impl ShareStore for FileShareStore {
    fn put(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| StoreError::Io(e.to_string()))?;
        }

        let result = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path);

        match result {
            Ok(mut file) => file
                .write_all(value.as_bytes())
                .map_err(|e| StoreError::Io(e.to_string())),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                Err(StoreError::Conflict(key.to_string()))
            }
            Err(e) => Err(StoreError::Io(e.to_string())),
        }
    }

    fn get(&self, key: &str) -> Result<String> {
        let path = self.path_for(key);
        match fs::File::open(&path) {
            Ok(mut file) => {
                let mut contents = String::new();
                file.read_to_string(&mut contents)
                    .map_err(|e| StoreError::Io(e.to_string()))?;
                Ok(contents)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(StoreError::NotFound(key.to_string()))
            }
            Err(e) => Err(StoreError::Io(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn put_then_get_round_trips() {
        let dir = tempdir().unwrap();
        let store = FileShareStore::new(dir.path());
        store.put("hyperliquid/tss-shares/w1/share-1", "deadbeef").unwrap();
        assert_eq!(
            store.get("hyperliquid/tss-shares/w1/share-1").unwrap(),
            "deadbeef"
        );
    }

    #[test]
    fn put_is_create_if_absent() {
        let dir = tempdir().unwrap();
        let store = FileShareStore::new(dir.path());
        store.put("k", "v1").unwrap();
        let err = store.put("k", "v2").unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[test]
    fn get_missing_is_not_found() {
        let dir = tempdir().unwrap();
        let store = FileShareStore::new(dir.path());
        assert!(matches!(store.get("nope"), Err(StoreError::NotFound(_))));
    }
}
