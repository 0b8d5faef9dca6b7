use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::date_key::DateKey;
use crate::records::STORAGE_PREFIX;
use crate::settings::SETTINGS_KEY;
use crate::storage::{write_atomic_bytes, KeyValueStore, StorageError};

pub const BACKUP_PREFIX: &str = "plan_focus_backup";
pub const BACKUP_EXT: &str = "json";

#[derive(Debug, thiserror::Error)]
pub enum BackupError {
    #[error("backup is not valid JSON: {0}")]
    Format(#[from] serde_json::Error),
    #[error("backup must be a JSON object of storage keys")]
    NotAnObject,
    #[error("failed to write {key}: {source}")]
    Storage {
        key: String,
        #[source]
        source: StorageError,
    },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub written: Vec<String>,
    /// Keys in the document that are neither daily records nor settings.
    pub ignored: Vec<String>,
}

fn is_backup_key(key: &str) -> bool {
    key.starts_with(STORAGE_PREFIX) || key == SETTINGS_KEY
}

pub fn backup_file_name(today: &DateKey) -> String {
    format!("{BACKUP_PREFIX}_{today}.{BACKUP_EXT}")
}

pub struct BackupCodec<S> {
    store: Arc<S>,
}

impl<S: KeyValueStore> BackupCodec<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Every record and the settings entry, keyed by storage key with values
    /// parsed back into JSON. Unparseable values are left out.
    pub fn export_all(&self) -> Result<Map<String, Value>, StorageError> {
        let mut document = Map::new();
        for key in self.store.keys()? {
            if !is_backup_key(&key) {
                continue;
            }
            let Some(raw) = self.store.get(&key)? else {
                continue;
            };
            match serde_json::from_str::<Value>(&raw) {
                Ok(value) => {
                    document.insert(key, value);
                }
                Err(error) => log::warn!("skipping unparseable entry in export key={key} error={error}"),
            }
        }
        Ok(document)
    }

    pub fn export_json(&self) -> Result<String, StorageError> {
        let document = self.export_all()?;
        Ok(serde_json::to_string_pretty(&Value::Object(document))?)
    }

    /// Writes `<dir>/plan_focus_backup_<today>.json` and returns its path.
    pub fn export_to_dir(&self, dir: &Path, today: &DateKey) -> Result<PathBuf, StorageError> {
        let path = dir.join(backup_file_name(today));
        let json = self.export_json()?;
        write_atomic_bytes(&path, json.as_bytes())?;
        log::info!("backup exported path={}", path.display());
        Ok(path)
    }

    /// Overwrites every matching key verbatim. Keys absent from the document
    /// are left alone. The document is fully parsed before anything is
    /// written; a storage failure part way through leaves earlier keys written.
    pub fn import_all(&self, document: &str) -> Result<ImportReport, BackupError> {
        let parsed: Value = serde_json::from_str(document)?;
        let Value::Object(entries) = parsed else {
            return Err(BackupError::NotAnObject);
        };
        let mut report = ImportReport::default();
        for (key, value) in entries {
            if !is_backup_key(&key) {
                report.ignored.push(key);
                continue;
            }
            let raw = serde_json::to_string(&value)?;
            self.store
                .set(&key, &raw)
                .map_err(|source| BackupError::Storage {
                    key: key.clone(),
                    source,
                })?;
            report.written.push(key);
        }
        log::info!(
            "backup imported written={} ignored={}",
            report.written.len(),
            report.ignored.len()
        );
        Ok(report)
    }

    pub fn import_file(&self, path: &Path) -> Result<ImportReport, BackupError> {
        let document = fs::read_to_string(path)?;
        self.import_all(&document)
    }
}
