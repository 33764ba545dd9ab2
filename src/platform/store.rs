//! Persistent client-side key/value storage
//!
//! Holds small string values (the selected organization id) across restarts,
//! the way a browser's `localStorage` does for the dashboard.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::StoreError;

type Result<T> = std::result::Result<T, StoreError>;

/// String key/value store surviving page reloads
pub trait PersistentStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    fn set(&self, key: &str, value: &str) -> Result<()>;

    fn remove(&self, key: &str) -> Result<()>;
}

/// Process-local store
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PersistentStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.lock().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.values
            .lock()
            .map_err(|_| StoreError::Io("store lock poisoned".to_string()))?
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.values
            .lock()
            .map_err(|_| StoreError::Io("store lock poisoned".to_string()))?
            .remove(key);
        Ok(())
    }
}

/// YAML-file-backed store.
///
/// The whole map is rewritten on every change; the file is created with
/// 0600 permissions on Unix.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    values: Mutex<BTreeMap<String, String>>,
}

impl FileStore {
    /// Open the store at the default location (`<data dir>/posture/state.yaml`)
    pub fn open() -> Result<Self> {
        Self::open_at(Self::default_path()?)
    }

    pub fn default_path() -> Result<PathBuf> {
        let base = dirs::data_dir().ok_or(StoreError::NoDataDir)?;
        Ok(base.join("posture").join("state.yaml"))
    }

    /// Open the store at a specific file, loading existing values
    pub fn open_at(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let values = if path.exists() {
            let contents =
                std::fs::read_to_string(&path).map_err(|e| StoreError::Io(e.to_string()))?;
            if contents.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_yaml::from_str(&contents).map_err(|e| StoreError::Corrupt(e.to_string()))?
            }
        } else {
            BTreeMap::new()
        };

        Ok(Self {
            path,
            values: Mutex::new(values),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write(&self, values: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::Io(e.to_string()))?;
        }

        let contents = serde_yaml::to_string(values).map_err(|e| StoreError::Io(e.to_string()))?;
        std::fs::write(&self.path, contents).map_err(|e| StoreError::Io(e.to_string()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            std::fs::set_permissions(&self.path, perms)
                .map_err(|e| StoreError::Io(e.to_string()))?;
        }

        Ok(())
    }

    fn update(&self, change: impl FnOnce(&mut BTreeMap<String, String>)) -> Result<()> {
        let mut values = self
            .values
            .lock()
            .map_err(|_| StoreError::Io("store lock poisoned".to_string()))?;
        // Memory only changes once the file holds the new contents
        let mut next = values.clone();
        change(&mut next);
        self.write(&next)?;
        *values = next;
        Ok(())
    }
}

impl PersistentStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.lock().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.update(|values| {
            values.insert(key.to_string(), value.to_string());
        })
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.update(|values| {
            values.remove(key);
        })
    }
}
