use crate::error::StudioError;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

const STORE_FILE: &str = "storage.json";

/// Durable string key-value storage shared by preferences and the auth session.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StudioError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StudioError>;
    fn remove(&self, key: &str) -> Result<(), StudioError>;
}

/// One JSON object on disk, rewritten on every mutation.
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self { path: dir.as_ref().join(STORE_FILE) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> Result<Map<String, Value>, StudioError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => return Err(e.into()),
        };
        if text.trim().is_empty() {
            return Ok(Map::new());
        }
        match serde_json::from_str::<Value>(&text)? {
            Value::Object(map) => Ok(map),
            _ => Err(StudioError::Storage(format!(
                "{} does not hold a JSON object",
                self.path.display()
            ))),
        }
    }

    /// Like `read_map`, but unreadable contents are replaced rather than blocking the write.
    fn read_map_for_update(&self) -> Result<Map<String, Value>, StudioError> {
        match self.read_map() {
            Err(StudioError::Io(e)) => Err(StudioError::Io(e)),
            Err(e) => {
                log::warn!("Discarding unreadable store {}: {e}", self.path.display());
                Ok(Map::new())
            }
            ok => ok,
        }
    }

    fn write_map(&self, map: &Map<String, Value>) -> Result<(), StudioError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let temp_path = self.path.with_extension("json.tmp");
        fs::write(&temp_path, serde_json::to_string_pretty(map)?)?;
        fs::rename(&temp_path, &self.path)?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StudioError> {
        Ok(self
            .read_map()?
            .get(key)
            .and_then(|v| v.as_str())
            .map(str::to_string))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StudioError> {
        let mut map = self.read_map_for_update()?;
        map.insert(key.to_string(), Value::String(value.to_string()));
        self.write_map(&map)
    }

    fn remove(&self, key: &str) -> Result<(), StudioError> {
        let mut map = self.read_map_for_update()?;
        if map.remove(key).is_some() {
            self.write_map(&map)?;
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>, StudioError> {
        self.entries
            .lock()
            .map_err(|_| StudioError::Storage("memory store poisoned".into()))
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StudioError> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StudioError> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StudioError> {
        self.lock()?.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_store_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("nested"));
        assert_eq!(store.get("a").unwrap(), None);

        store.set("a", "1").unwrap();
        store.set("b", "2").unwrap();
        store.remove("a").unwrap();

        let reopened = FileStore::new(dir.path().join("nested"));
        assert_eq!(reopened.get("a").unwrap(), None);
        assert_eq!(reopened.get("b").unwrap().as_deref(), Some("2"));
    }

    #[test]
    fn file_store_rejects_non_object_contents() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        fs::write(store.path(), "[1, 2]").unwrap();
        assert!(matches!(store.get("a"), Err(StudioError::Storage(_))));
    }

    #[test]
    fn truncated_file_is_replaced_on_next_write() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        fs::write(store.path(), r#"{"kmn_openrouter_key": "sk-"#).unwrap();
        assert!(store.get("kmn_openrouter_key").is_err());

        store.set("kmn_openrouter_key", "sk-new").unwrap();
        store.set("kmn_openrouter_model", "openai/gpt-4o").unwrap();

        let reopened = FileStore::new(dir.path());
        assert_eq!(reopened.get("kmn_openrouter_key").unwrap().as_deref(), Some("sk-new"));
        assert_eq!(reopened.get("kmn_openrouter_model").unwrap().as_deref(), Some("openai/gpt-4o"));
    }

    #[test]
    fn writes_leave_no_temp_file_behind() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        store.set("a", "1").unwrap();
        store.remove("a").unwrap();

        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, vec![STORE_FILE.to_string()]);
    }

    #[test]
    fn removing_missing_key_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        store.remove("missing").unwrap();
        assert!(!store.path().exists());
    }

    #[test]
    fn memory_store_round_trip() {
        let store = MemoryStore::new();
        store.set("k", "v").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));
        store.remove("k").unwrap();
        assert_eq!(store.get("k").unwrap(), None);
    }
}
