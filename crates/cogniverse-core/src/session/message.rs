//! Conversation message types.
//!
//! The serialized field names (`message`, `type`, `fileName`) match the
//! layout chat history has always been stored in, so existing exports load
//! unchanged.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use strum::{Display, EnumString};

/// Who produced a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
pub enum Sender {
    User,
    Bot,
}

/// What a message's content holds.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MessageKind {
    /// Plain text.
    #[default]
    Text,
    /// A `data:` URI of an attached file.
    File,
    /// A `data:` URI of a voice recording.
    Audio,
}

/// Identifier of a chat session: milliseconds since the Unix epoch at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub i64);

impl SessionId {
    /// An id for the current instant.
    pub fn now() -> Self {
        Self(Utc::now().timestamp_millis())
    }

    /// The id one tick after this one.
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SessionId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

/// A single turn in a chat session.
///
/// Immutable once appended to a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub sender: Sender,
    /// Text, or a `data:` URI for file and audio messages.
    #[serde(rename = "message")]
    pub content: String,
    #[serde(rename = "type", default)]
    pub kind: MessageKind,
    #[serde(
        rename = "fileName",
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "empty_as_none"
    )]
    pub file_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl Message {
    /// A text message stamped with the current time.
    pub fn text(sender: Sender, content: impl Into<String>) -> Self {
        Self {
            sender,
            content: content.into(),
            kind: MessageKind::Text,
            file_name: None,
            timestamp: Some(Utc::now()),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::text(Sender::User, content)
    }

    pub fn bot(content: impl Into<String>) -> Self {
        Self::text(Sender::Bot, content)
    }

    /// A file attachment sent by the user.
    pub fn file(uri: impl Into<String>, file_name: impl Into<String>) -> Self {
        Self {
            sender: Sender::User,
            content: uri.into(),
            kind: MessageKind::File,
            file_name: Some(file_name.into()),
            timestamp: Some(Utc::now()),
        }
    }

    /// A voice recording sent by the user.
    pub fn audio(uri: impl Into<String>) -> Self {
        Self {
            sender: Sender::User,
            content: uri.into(),
            kind: MessageKind::Audio,
            file_name: None,
            timestamp: Some(Utc::now()),
        }
    }

    /// Overrides the timestamp.
    pub fn with_timestamp(mut self, timestamp: Option<DateTime<Utc>>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn is_text(&self) -> bool {
        self.kind == MessageKind::Text
    }
}

fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.is_empty()))
}
