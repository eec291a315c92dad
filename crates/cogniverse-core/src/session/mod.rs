//! Session domain module.
//!
//! # Module Structure
//!
//! - `message`: `Message`, `Sender`, `MessageKind`, `SessionId`
//! - `history`: `ChatHistory`, the persisted session mapping
//! - `store`: `SessionStore`, the write-through owner of the mapping
//! - `library`: listing, search and statistics
//!
//! # Usage
//!
//! ```ignore
//! use cogniverse_core::session::{Message, SessionStore};
//!
//! let mut sessions = SessionStore::load(storage);
//! let id = sessions.create();
//! sessions.append(id, Message::user("hello"));
//! ```

mod history;
pub mod library;
mod message;
mod store;

pub use history::ChatHistory;
pub use library::{ChatSummary, ConversationStats};
pub use message::{Message, MessageKind, Sender, SessionId};
pub use store::SessionStore;
