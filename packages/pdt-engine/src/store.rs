use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Error, Result};

/// Scalar snapshot produced by a trigger query, used to decide whether a
/// PDT's source data changed since the last materialization. Timestamps are
/// normalized to RFC 3339 text by the warehouse layer so equality is stable
/// across runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TriggerValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    Null,
}

impl std::fmt::Display for TriggerValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TriggerValue::Bool(b) => write!(f, "{}", b),
            TriggerValue::Integer(i) => write!(f, "{}", i),
            TriggerValue::Float(x) => write!(f, "{}", x),
            TriggerValue::Text(s) => write!(f, "{}", s),
            TriggerValue::Null => write!(f, "null"),
        }
    }
}

/// Durable per-view persistence of the last-seen trigger value. Absence of a
/// key means the view was never regenerated. Mutated only by the
/// regeneration driver, after a successful commit.
pub trait TriggerValueStore {
    fn get(&self, view_name: &str) -> Result<Option<TriggerValue>>;
    fn put(&mut self, view_name: &str, value: TriggerValue) -> Result<()>;
}

/// File-backed store: one JSON document mapping view name to last-seen
/// value, rewritten on every put so a crash between runs loses nothing.
pub struct FileTriggerValueStore {
    path: PathBuf,
    values: HashMap<String, TriggerValue>,
}

impl FileTriggerValueStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let values = if path.exists() {
            let content = fs::read_to_string(&path)
                .map_err(|e| Error::Store(format!("failed to read {:?}: {}", path, e)))?;
            serde_json::from_str(&content)
                .map_err(|e| Error::Store(format!("failed to parse {:?}: {}", path, e)))?
        } else {
            info!(path = ?path, "No trigger value file found, starting fresh");
            HashMap::new()
        };
        Ok(Self { path, values })
    }

    fn flush(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| Error::Store(format!("failed to create {:?}: {}", parent, e)))?;
        }
        let content = serde_json::to_string_pretty(&self.values)
            .map_err(|e| Error::Store(format!("failed to serialize trigger values: {}", e)))?;
        fs::write(&self.path, content)
            .map_err(|e| Error::Store(format!("failed to write {:?}: {}", self.path, e)))
    }
}

impl TriggerValueStore for FileTriggerValueStore {
    fn get(&self, view_name: &str) -> Result<Option<TriggerValue>> {
        Ok(self.values.get(view_name).cloned())
    }

    fn put(&mut self, view_name: &str, value: TriggerValue) -> Result<()> {
        self.values.insert(view_name.to_string(), value);
        self.flush()
    }
}

#[cfg(test)]
mod trigger_value_store_test {
    use super::*;

    #[test]
    fn test_absent_key_means_never_regenerated() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTriggerValueStore::open(dir.path().join("values.json")).unwrap();
        assert_eq!(store.get("der1").unwrap(), None);
    }

    #[test]
    fn test_put_then_get_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileTriggerValueStore::open(dir.path().join("values.json")).unwrap();
        store.put("der1", TriggerValue::Integer(42)).unwrap();
        assert_eq!(store.get("der1").unwrap(), Some(TriggerValue::Integer(42)));
    }

    #[test]
    fn test_values_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("values.json");
        {
            let mut store = FileTriggerValueStore::open(&path).unwrap();
            store
                .put("der1", TriggerValue::Text("2026-01-01".to_string()))
                .unwrap();
            store.put("der2", TriggerValue::Float(1.5)).unwrap();
        }
        let store = FileTriggerValueStore::open(&path).unwrap();
        assert_eq!(
            store.get("der1").unwrap(),
            Some(TriggerValue::Text("2026-01-01".to_string()))
        );
        assert_eq!(store.get("der2").unwrap(), Some(TriggerValue::Float(1.5)));
    }

    #[test]
    fn test_null_trigger_value_roundtrips_as_json_null() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("values.json");
        {
            let mut store = FileTriggerValueStore::open(&path).unwrap();
            store.put("der1", TriggerValue::Null).unwrap();
        }
        let store = FileTriggerValueStore::open(&path).unwrap();
        assert_eq!(store.get("der1").unwrap(), Some(TriggerValue::Null));
    }
}
