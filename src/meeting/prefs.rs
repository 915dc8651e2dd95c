//! User preferences persisted in an injected key-value store.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{ClassMeetResult, ResultExt};

const DISPLAY_NAME_KEY: &str = "meetingUsername";

fn topic_key(user_id: &str) -> String {
    format!("meetingTopic_{}", user_id)
}

fn meeting_id_key(user_id: &str) -> String {
    format!("meetingId_{}", user_id)
}

/// String key-value persistence (browser local storage, a file, ...).
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> ClassMeetResult<()>;
}

/// Volatile store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.read().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> ClassMeetResult<()> {
        self.values
            .write()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Store backed by a single JSON object on disk. Every write rewrites the file.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    values: RwLock<HashMap<String, String>>,
}

impl JsonFileStore {
    /// Open `path`, starting empty if the file does not exist yet.
    pub fn open(path: impl AsRef<Path>) -> ClassMeetResult<Self> {
        let path = path.as_ref().to_path_buf();
        let values = if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read preferences {}", path.display()))?;
            serde_json::from_str(&content)?
        } else {
            HashMap::new()
        };
        log::debug!(
            "[PREFS] Opened {} ({} entries)",
            path.display(),
            values.len()
        );
        Ok(Self {
            path,
            values: RwLock::new(values),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.read().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> ClassMeetResult<()> {
        let mut values = self.values.write();
        let mut updated = values.clone();
        updated.insert(key.to_string(), value.to_string());

        // Memory only changes once the file holds the new map.
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(&updated)?;
        fs::write(&self.path, content)?;
        *values = updated;
        Ok(())
    }
}

/// Typed accessors over a [`KeyValueStore`].
#[derive(Clone)]
pub struct Preferences {
    store: Arc<dyn KeyValueStore>,
}

impl Preferences {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Preferences over a fresh [`MemoryStore`].
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    /// Display name last used to join a meeting.
    pub fn display_name(&self) -> Option<String> {
        self.store.get(DISPLAY_NAME_KEY)
    }

    pub fn set_display_name(&self, name: &str) -> ClassMeetResult<()> {
        self.store.set(DISPLAY_NAME_KEY, name)
    }

    /// Topic saved for meetings created by `user_id`.
    pub fn topic_for(&self, user_id: &str) -> Option<String> {
        self.store.get(&topic_key(user_id)).filter(|t| !t.is_empty())
    }

    pub fn set_topic(&self, user_id: &str, topic: &str) -> ClassMeetResult<()> {
        self.store.set(&topic_key(user_id), topic)
    }

    /// Personal room id chosen by `user_id`.
    pub fn meeting_id_for(&self, user_id: &str) -> Option<String> {
        self.store
            .get(&meeting_id_key(user_id))
            .filter(|id| !id.is_empty())
    }

    pub fn set_meeting_id(&self, user_id: &str, meeting_id: &str) -> ClassMeetResult<()> {
        self.store.set(&meeting_id_key(user_id), meeting_id)
    }
}
