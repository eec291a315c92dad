//! In-memory session mapping with write-through persistence.

use super::history::ChatHistory;
use super::message::{Message, SessionId};
use crate::storage::ChatStorage;

/// Owns every chat session and persists the whole mapping after each
/// mutation.
///
/// Single writer: all mutations take `&mut self`.
pub struct SessionStore {
    history: ChatHistory,
    storage: ChatStorage,
    last_allocated: Option<SessionId>,
    last_active: Option<SessionId>,
}

impl SessionStore {
    /// Loads the persisted history (empty if missing or unreadable).
    pub fn load(storage: ChatStorage) -> Self {
        let history = storage.load_history();
        let last_active = storage
            .load_last_chat_id()
            .filter(|id| history.contains(*id));
        tracing::debug!("Loaded {} chat session(s)", history.len());
        Self {
            history,
            storage,
            last_allocated: None,
            last_active,
        }
    }

    /// Allocates a fresh id and creates an empty session for it.
    pub fn create(&mut self) -> SessionId {
        let id = self.allocate_id();
        self.history.reset(id);
        self.persist();
        tracing::debug!("Created chat session {}", id);
        id
    }

    /// Appends a message, creating the session if absent.
    pub fn append(&mut self, id: SessionId, message: Message) {
        self.history.push(id, message);
        self.persist();
    }

    pub fn get(&self, id: SessionId) -> Option<&[Message]> {
        self.history.get(id)
    }

    pub fn contains(&self, id: SessionId) -> bool {
        self.history.contains(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = SessionId> + '_ {
        self.history.ids()
    }

    /// Session the user last had open, if it still exists.
    pub fn last_active(&self) -> Option<SessionId> {
        self.last_active
    }

    /// Records `id` as the open session and persists the choice.
    pub fn set_last_active(&mut self, id: SessionId) {
        self.last_active = Some(id);
        self.storage.save_last_chat_id(id);
    }

    pub fn history(&self) -> &ChatHistory {
        &self.history
    }

    pub fn storage(&self) -> &ChatStorage {
        &self.storage
    }

    /// Merges imported sessions, overwriting colliding ids.
    pub fn merge(&mut self, incoming: ChatHistory) {
        self.history.merge(incoming);
        self.persist();
    }

    /// Stores `messages` under a freshly allocated id.
    pub fn insert_new(&mut self, messages: Vec<Message>) -> SessionId {
        let id = self.allocate_id();
        self.history.insert(id, messages);
        self.persist();
        id
    }

    /// Drops every session and the persisted state.
    pub fn clear_all(&mut self) {
        self.history.clear();
        self.last_active = None;
        self.storage.clear();
        tracing::info!("Cleared all chat history");
    }

    /// Writes the current mapping to storage.
    pub fn flush(&self) {
        self.persist();
    }

    /// Time-based id, bumped past anything already handed out or stored so
    /// two sessions created within the same millisecond stay distinct.
    fn allocate_id(&mut self) -> SessionId {
        let mut id = SessionId::now();
        if let Some(last) = self.last_allocated {
            id = id.max(last.next());
        }
        while self.history.contains(id) {
            id = id.next();
        }
        self.last_allocated = Some(id);
        id
    }

    fn persist(&self) {
        self.storage.save_history(&self.history);
    }
}
