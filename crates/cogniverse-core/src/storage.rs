//! Storage adapter for chat history and preferences.
//!
//! [`KeyValueStore`] is the persistence seam: a flat map of string keys to
//! string values. [`ChatStorage`] layers the JSON encoding of chat state on
//! top of it. Read and write failures are logged and degrade to empty state;
//! they never block the conversation.

use crate::error::{CogniverseError, Result};
use crate::session::{ChatHistory, SessionId};
use crate::settings::{FontSize, Settings, Theme};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Key holding the serialized [`ChatHistory`].
pub const CHATS_KEY: &str = "cogniverseChats";
/// Key receiving a copy of stored chats that could not be decoded.
pub const CHATS_BACKUP_KEY: &str = "cogniverseChats-backup";
/// Key holding the last active session id.
pub const LAST_CHAT_KEY: &str = "cogniverse-last-chat";
pub const THEME_KEY: &str = "cogniverse-theme";
pub const FONT_SIZE_KEY: &str = "cogniverse-font-size";
pub const AUTO_SCROLL_KEY: &str = "cogniverse-auto-scroll";

/// A persistent string key/value store.
pub trait KeyValueStore: Send + Sync {
    /// Returns the value stored under `key`, if any.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Stores `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Removes `key`. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<()>;
}

/// Process-local [`KeyValueStore`]. Clones share the same entries.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|_| CogniverseError::internal("memory store lock poisoned"))
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.lock()?.remove(key);
        Ok(())
    }
}

/// JSON persistence of chat state over a [`KeyValueStore`].
#[derive(Clone)]
pub struct ChatStorage {
    store: Arc<dyn KeyValueStore>,
}

impl ChatStorage {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Loads all sessions, or an empty history if nothing usable is stored.
    ///
    /// Undecodable data is copied to [`CHATS_BACKUP_KEY`] before the empty
    /// history is returned, so the next save cannot destroy it.
    pub fn load_history(&self) -> ChatHistory {
        let raw = match self.store.get(CHATS_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return ChatHistory::new(),
            Err(e) => {
                tracing::warn!("Error loading chats: {}", e);
                return ChatHistory::new();
            }
        };

        match serde_json::from_str(&raw) {
            Ok(history) => history,
            Err(e) => {
                tracing::warn!(
                    "Stored chats are not valid chat history, starting empty (copy kept under '{}'): {}",
                    CHATS_BACKUP_KEY,
                    e
                );
                self.set_logged(CHATS_BACKUP_KEY, &raw);
                ChatHistory::new()
            }
        }
    }

    /// Persists all sessions. Failures are logged.
    pub fn save_history(&self, history: &ChatHistory) {
        let result = serde_json::to_string(history)
            .map_err(CogniverseError::from)
            .and_then(|json| self.store.set(CHATS_KEY, &json));
        if let Err(e) = result {
            tracing::warn!("Error saving chats: {}", e);
        }
    }

    pub fn load_last_chat_id(&self) -> Option<SessionId> {
        match self.store.get(LAST_CHAT_KEY) {
            Ok(Some(raw)) => match raw.parse() {
                Ok(id) => Some(id),
                Err(e) => {
                    tracing::warn!("Ignoring unreadable last chat id '{}': {}", raw, e);
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                tracing::warn!("Error loading last chat id: {}", e);
                None
            }
        }
    }

    pub fn save_last_chat_id(&self, id: SessionId) {
        self.set_logged(LAST_CHAT_KEY, &id.to_string());
    }

    /// Loads preferences; unreadable values fall back to their defaults.
    pub fn load_settings(&self) -> Settings {
        let defaults = Settings::default();
        Settings {
            theme: self.get_parsed::<Theme>(THEME_KEY).unwrap_or(defaults.theme),
            font_size: self
                .get_parsed::<FontSize>(FONT_SIZE_KEY)
                .unwrap_or(defaults.font_size),
            auto_scroll: self
                .get_parsed::<bool>(AUTO_SCROLL_KEY)
                .unwrap_or(defaults.auto_scroll),
        }
    }

    pub fn save_settings(&self, settings: &Settings) {
        self.set_logged(THEME_KEY, &settings.theme.to_string());
        self.set_logged(FONT_SIZE_KEY, &settings.font_size.to_string());
        self.set_logged(AUTO_SCROLL_KEY, &settings.auto_scroll.to_string());
    }

    /// Removes persisted chats, their backup and the last active id.
    /// Preferences survive.
    pub fn clear(&self) {
        for key in [CHATS_KEY, CHATS_BACKUP_KEY, LAST_CHAT_KEY] {
            if let Err(e) = self.store.remove(key) {
                tracing::warn!("Error removing '{}': {}", key, e);
            }
        }
    }

    fn get_parsed<T: std::str::FromStr>(&self, key: &str) -> Option<T> {
        match self.store.get(key) {
            Ok(value) => value.and_then(|v| v.parse().ok()),
            Err(e) => {
                tracing::warn!("Error reading '{}': {}", key, e);
                None
            }
        }
    }

    fn set_logged(&self, key: &str, value: &str) {
        if let Err(e) = self.store.set(key, value) {
            tracing::warn!("Error writing '{}': {}", key, e);
        }
    }
}
