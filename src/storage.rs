use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

const STORAGE_FILE: &str = "storage.json";

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("storage quota exceeded: {needed} bytes needed, {quota} allowed")]
    QuotaExceeded { needed: usize, quota: usize },
}

/// Flat string key space that every store in the crate is layered over.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn keys(&self) -> Result<Vec<String>, StorageError>;
}

/// Key space persisted as a single JSON object on disk.
///
/// Reads are served from a cache loaded at open; every `set` rewrites the
/// file atomically and only updates the cache once the write has landed.
pub struct FileStore {
    root: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileStore {
    pub fn open(root: PathBuf) -> Result<Self, StorageError> {
        fs::create_dir_all(&root)?;
        let path = root.join(STORAGE_FILE);
        let entries = if path.exists() {
            load_json(&path)?
        } else {
            BTreeMap::new()
        };
        log::debug!(
            "file store opened path={} keys={}",
            path.display(),
            entries.len()
        );
        Ok(Self {
            root,
            entries: Mutex::new(entries),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path(&self) -> PathBuf {
        self.root.join(STORAGE_FILE)
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let guard = self.entries.lock().expect("storage poisoned");
        Ok(guard.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut guard = self.entries.lock().expect("storage poisoned");
        let mut next = guard.clone();
        next.insert(key.to_string(), value.to_string());
        write_atomic(&self.path(), &next)?;
        *guard = next;
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        let guard = self.entries.lock().expect("storage poisoned");
        Ok(guard.keys().cloned().collect())
    }
}

/// In-process key space with an optional byte quota over keys and values.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
    quota: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(quota: usize) -> Self {
        Self {
            entries: Mutex::new(BTreeMap::new()),
            quota: Some(quota),
        }
    }

    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.entries.lock().expect("storage poisoned").clone()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let guard = self.entries.lock().expect("storage poisoned");
        Ok(guard.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut guard = self.entries.lock().expect("storage poisoned");
        if let Some(quota) = self.quota {
            let needed: usize = guard
                .iter()
                .filter(|(existing, _)| existing.as_str() != key)
                .map(|(k, v)| k.len() + v.len())
                .sum::<usize>()
                + key.len()
                + value.len();
            if needed > quota {
                return Err(StorageError::QuotaExceeded { needed, quota });
            }
        }
        guard.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        let guard = self.entries.lock().expect("storage poisoned");
        Ok(guard.keys().cloned().collect())
    }
}

fn load_json(path: &Path) -> Result<BTreeMap<String, String>, StorageError> {
    let mut file = File::open(path)?;
    let mut buf = String::new();
    file.read_to_string(&mut buf)?;
    Ok(serde_json::from_str(&buf)?)
}

pub(crate) fn write_atomic_bytes(path: &Path, bytes: &[u8]) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let temp_path = path.with_extension("tmp");
    {
        let mut file = File::create(&temp_path)?;
        file.write_all(bytes)?;
        file.sync_all()?;
    }
    fs::rename(temp_path, path)?;
    Ok(())
}

fn write_atomic(path: &Path, entries: &BTreeMap<String, String>) -> Result<(), StorageError> {
    let json = serde_json::to_vec_pretty(entries)?;
    write_atomic_bytes(path, &json)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_store_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path().to_path_buf()).unwrap();
        store.set("a", "1").unwrap();
        store.set("b", "{\"x\":2}").unwrap();
        store.set("a", "3").unwrap();
        drop(store);

        let reopened = FileStore::open(dir.path().to_path_buf()).unwrap();
        assert_eq!(reopened.get("a").unwrap().as_deref(), Some("3"));
        assert_eq!(reopened.get("b").unwrap().as_deref(), Some("{\"x\":2}"));
        assert_eq!(reopened.get("missing").unwrap(), None);
        assert_eq!(reopened.keys().unwrap(), vec!["a".to_string(), "b".to_string()]);
        assert!(!dir.path().join("storage.tmp").exists());
    }

    #[test]
    fn file_store_rejects_corrupt_file_on_open() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(STORAGE_FILE), b"not json").unwrap();
        let err = FileStore::open(dir.path().to_path_buf()).err().expect("open should fail");
        assert!(matches!(err, StorageError::Json(_)));
    }

    #[test]
    fn file_store_failed_write_keeps_previous_value() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path().to_path_buf()).unwrap();
        store.set("a", "1").unwrap();

        // A directory squatting on the temp path makes File::create fail.
        fs::create_dir_all(dir.path().join("storage.tmp")).unwrap();
        assert!(matches!(store.set("a", "2"), Err(StorageError::Io(_))));
        assert_eq!(store.get("a").unwrap().as_deref(), Some("1"));
    }

    #[test]
    fn memory_store_enforces_quota_per_write() {
        let store = MemoryStore::with_quota(10);
        store.set("k", "12345").unwrap();
        // Overwriting the same key only counts the replacement.
        store.set("k", "123456789").unwrap();
        let err = store.set("other", "x").unwrap_err();
        assert!(matches!(
            err,
            StorageError::QuotaExceeded {
                needed: 16,
                quota: 10
            }
        ));
        assert_eq!(store.get("other").unwrap(), None);
        assert_eq!(store.snapshot().len(), 1);
    }
}
