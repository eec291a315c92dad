//! The session mapping: the unit of persistence.

use super::message::{Message, SessionId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// All chat sessions, keyed by id.
///
/// Serializes as a JSON object whose keys are the stringified ids and whose
/// values are the ordered message lists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChatHistory {
    sessions: BTreeMap<SessionId, Vec<Message>>,
}

impl ChatHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: SessionId) -> Option<&[Message]> {
        self.sessions.get(&id).map(Vec::as_slice)
    }

    pub fn contains(&self, id: SessionId) -> bool {
        self.sessions.contains_key(&id)
    }

    /// Creates an empty session, replacing any existing one with the same id.
    pub fn reset(&mut self, id: SessionId) {
        self.sessions.insert(id, Vec::new());
    }

    /// Appends to a session, creating it if absent.
    pub fn push(&mut self, id: SessionId, message: Message) {
        self.sessions.entry(id).or_default().push(message);
    }

    /// Replaces a session's messages wholesale.
    pub fn insert(&mut self, id: SessionId, messages: Vec<Message>) {
        self.sessions.insert(id, messages);
    }

    /// Overwrites colliding ids with `other`'s sessions (last write wins).
    pub fn merge(&mut self, other: ChatHistory) {
        self.sessions.extend(other.sessions);
    }

    pub fn ids(&self) -> impl Iterator<Item = SessionId> + '_ {
        self.sessions.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (SessionId, &[Message])> {
        self.sessions.iter().map(|(id, msgs)| (*id, msgs.as_slice()))
    }

    /// Highest id in use.
    pub fn max_id(&self) -> Option<SessionId> {
        self.sessions.keys().next_back().copied()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn clear(&mut self) {
        self.sessions.clear();
    }
}
