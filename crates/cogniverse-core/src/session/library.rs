//! Chat listing, search and statistics over a [`ChatHistory`].

use super::history::ChatHistory;
use super::message::{Message, Sender, SessionId};
use chrono::{DateTime, Utc};
use std::cmp::Reverse;

const TITLE_MAX_CHARS: usize = 30;

/// One row of the chat library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatSummary {
    pub id: SessionId,
    pub title: String,
    /// Timestamp of the first message, if it has one.
    pub started_at: Option<DateTime<Utc>>,
    pub message_count: usize,
}

/// Title shown for a session: its first user message, shortened.
pub fn chat_title(id: SessionId, messages: &[Message]) -> String {
    messages
        .iter()
        .find(|m| m.sender == Sender::User)
        .map(|m| truncate_title(&m.content))
        .unwrap_or_else(|| format!("Chat {id}"))
}

/// Shortens text to the title length, marking the cut with `...`.
pub fn truncate_title(text: &str) -> String {
    if text.chars().count() > TITLE_MAX_CHARS {
        let head: String = text.chars().take(TITLE_MAX_CHARS).collect();
        format!("{head}...")
    } else {
        text.to_string()
    }
}

fn summarize(id: SessionId, messages: &[Message]) -> ChatSummary {
    ChatSummary {
        id,
        title: chat_title(id, messages),
        started_at: messages.first().and_then(|m| m.timestamp),
        message_count: messages.len(),
    }
}

/// All sessions, most recently started first; undated sessions last.
pub fn library(history: &ChatHistory) -> Vec<ChatSummary> {
    let mut rows: Vec<ChatSummary> = history
        .iter()
        .map(|(id, messages)| summarize(id, messages))
        .collect();
    rows.sort_by_key(|row| Reverse(row.started_at));
    rows
}

/// Sessions where any message content or file name contains `term`,
/// case-insensitively. A blank term lists everything.
pub fn search(history: &ChatHistory, term: &str) -> Vec<ChatSummary> {
    let needle = term.trim().to_lowercase();
    if needle.is_empty() {
        return library(history);
    }

    library(history)
        .into_iter()
        .filter(|row| {
            history.get(row.id).is_some_and(|messages| {
                messages.iter().any(|m| {
                    m.content.to_lowercase().contains(&needle)
                        || m
                            .file_name
                            .as_deref()
                            .is_some_and(|name| name.to_lowercase().contains(&needle))
                })
            })
        })
        .collect()
}

/// Counts across every stored conversation.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversationStats {
    pub total_chats: usize,
    pub total_messages: usize,
    pub user_messages: usize,
    pub bot_messages: usize,
    pub average_messages_per_chat: f64,
}

impl ConversationStats {
    pub fn collect(history: &ChatHistory) -> Self {
        let total_chats = history.len();
        let mut total_messages = 0;
        let mut user_messages = 0;

        for (_, messages) in history.iter() {
            total_messages += messages.len();
            user_messages += messages.iter().filter(|m| m.sender == Sender::User).count();
        }

        let average_messages_per_chat = if total_chats > 0 {
            total_messages as f64 / total_chats as f64
        } else {
            0.0
        };

        Self {
            total_chats,
            total_messages,
            user_messages,
            bot_messages: total_messages - user_messages,
            average_messages_per_chat,
        }
    }
}
