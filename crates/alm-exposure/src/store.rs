//! Durable key-value storage for policy state.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde_json::{Map, Value};

use crate::error::ExposureError;

/// Minimal durable key-value store. Values are JSON documents.
pub trait KvStore: Send + Sync {
    /// # Errors
    ///
    /// Backend read failures, or [`ExposureError::Corrupt`] if the backing
    /// data cannot be parsed.
    fn get(&self, key: &str) -> Result<Option<Value>, ExposureError>;

    /// # Errors
    ///
    /// Backend write failures.
    fn set(&self, key: &str, value: Value) -> Result<(), ExposureError>;

    /// # Errors
    ///
    /// Backend write failures.
    fn remove(&self, key: &str) -> Result<(), ExposureError>;
}

/// In-process store, for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryKvStore {
    values: Mutex<HashMap<String, Value>>,
}

impl MemoryKvStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvStore for MemoryKvStore {
    fn get(&self, key: &str) -> Result<Option<Value>, ExposureError> {
        Ok(self.values.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> Result<(), ExposureError> {
        self.values.lock().insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), ExposureError> {
        self.values.lock().remove(key);
        Ok(())
    }
}

/// A single JSON object file. Writes go to a sibling temp file and are
/// renamed into place.
#[derive(Debug)]
pub struct FileKvStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileKvStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> Result<Map<String, Value>, ExposureError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(source) => {
                return Err(ExposureError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };
        if raw.trim().is_empty() {
            return Ok(Map::new());
        }
        match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(other) => Err(ExposureError::Corrupt {
                path: self.path.clone(),
                reason: format!("top-level value is {}", type_name(&other)),
            }),
            Err(e) => Err(ExposureError::Corrupt {
                path: self.path.clone(),
                reason: e.to_string(),
            }),
        }
    }

    /// Read-modify-write. An unreadable file is replaced rather than
    /// blocking writes forever.
    fn update(&self, apply: impl FnOnce(&mut Map<String, Value>)) -> Result<(), ExposureError> {
        let _guard = self.write_lock.lock();
        let mut map = match self.read_map() {
            Ok(map) => map,
            Err(ExposureError::Corrupt { path, reason }) => {
                tracing::warn!(path = %path.display(), %reason, "replacing corrupt exposure store");
                Map::new()
            }
            Err(e) => return Err(e),
        };
        apply(&mut map);
        self.write_map(&map)
    }

    fn write_map(&self, map: &Map<String, Value>) -> Result<(), ExposureError> {
        let io_err = |source: std::io::Error| ExposureError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let json = serde_json::to_string_pretty(map)?;
        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, json.as_bytes()).map_err(io_err)?;
        fs::rename(&tmp_path, &self.path).map_err(io_err)
    }
}

impl KvStore for FileKvStore {
    fn get(&self, key: &str) -> Result<Option<Value>, ExposureError> {
        Ok(self.read_map()?.remove(key))
    }

    fn set(&self, key: &str, value: Value) -> Result<(), ExposureError> {
        self.update(|map| {
            map.insert(key.to_string(), value);
        })
    }

    fn remove(&self, key: &str) -> Result<(), ExposureError> {
        self.update(|map| {
            map.remove(key);
        })
    }
}

const fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn file_store_round_trips_and_keeps_other_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileKvStore::new(dir.path().join("nested").join("store.json"));

        assert_eq!(store.get("a").unwrap(), None);
        store.set("a", json!({ "n": 1 })).unwrap();
        store.set("b", json!("two")).unwrap();
        assert_eq!(store.get("a").unwrap(), Some(json!({ "n": 1 })));

        store.remove("a").unwrap();
        assert_eq!(store.get("a").unwrap(), None);
        assert_eq!(store.get("b").unwrap(), Some(json!("two")));
        assert!(!dir.path().join("nested").join("store.json.tmp").exists());
    }

    #[test]
    fn corrupt_file_reports_then_is_replaced_on_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        fs::write(&path, "[1, 2").unwrap();
        let store = FileKvStore::new(&path);

        assert!(matches!(store.get("a"), Err(ExposureError::Corrupt { .. })));
        store.set("a", json!(1)).unwrap();
        assert_eq!(store.get("a").unwrap(), Some(json!(1)));
    }

    #[test]
    fn non_object_file_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        fs::write(&path, "42").unwrap();
        let err = FileKvStore::new(&path).get("a").unwrap_err();
        assert!(err.to_string().contains("top-level value is a number"));
    }
}
