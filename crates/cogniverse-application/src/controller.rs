//! Chat controller: the single owner of conversation state.

use cogniverse_core::attachment::{Attachment, DEFAULT_ANALYSIS_PROMPT, audio_message};
use cogniverse_core::cache::ResponseCache;
use cogniverse_core::completion::{
    CompletionClient, CompletionError, ContextMessage, complete_streaming,
};
use cogniverse_core::context::ContextBuilder;
use cogniverse_core::error::{CogniverseError, Result};
use cogniverse_core::export::{self, ExportFormat, ExportedChat};
use cogniverse_core::session::library;
use cogniverse_core::session::{ChatSummary, ConversationStats, Message, SessionId, SessionStore};
use cogniverse_core::settings::{FontSize, Settings, Theme};
use cogniverse_core::storage::ChatStorage;
use std::path::Path;
use std::sync::Arc;

/// Where a reply came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplySource {
    /// Served from the response cache without a request.
    Cache,
    /// Returned by the completion service.
    Remote,
    /// The request failed; the content is the user-facing apology.
    Failed(CompletionError),
}

/// The bot message recorded for one send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Session the reply was appended to (the one open when the send began).
    pub session_id: SessionId,
    pub content: String,
    pub source: ReplySource,
}

impl Reply {
    pub fn is_failure(&self) -> bool {
        matches!(self.source, ReplySource::Failed(_))
    }
}

/// Owns sessions, cache, context policy, settings and the completion client.
///
/// Every operation that mutates conversation state takes `&mut self`, and
/// sends hold that borrow across the awaited completion, so a second send
/// cannot start before the first reply is recorded.
pub struct ChatController {
    sessions: SessionStore,
    cache: ResponseCache,
    context: ContextBuilder,
    client: Arc<dyn CompletionClient>,
    settings: Settings,
    current: SessionId,
}

impl ChatController {
    /// Loads persisted history and preferences and reopens the last chat,
    /// creating a fresh one when there is none.
    pub fn open(storage: ChatStorage, client: Arc<dyn CompletionClient>) -> Self {
        let settings = storage.load_settings();
        let mut sessions = SessionStore::load(storage);

        let current = match sessions.last_active() {
            Some(id) => id,
            None => sessions.create(),
        };
        sessions.set_last_active(current);

        tracing::info!(
            target: "cogniverse",
            "Opened chat {} ({} stored session(s))",
            current,
            sessions.history().len()
        );

        Self {
            sessions,
            cache: ResponseCache::default(),
            context: ContextBuilder::default(),
            client,
            settings,
            current,
        }
    }

    pub fn with_cache(mut self, cache: ResponseCache) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_context_builder(mut self, context: ContextBuilder) -> Self {
        self.context = context;
        self
    }

    pub fn current_chat_id(&self) -> SessionId {
        self.current
    }

    pub fn current_messages(&self) -> &[Message] {
        self.sessions.get(self.current).unwrap_or_default()
    }

    /// Title of the open chat, or "New Chat" while it is empty.
    pub fn current_title(&self) -> String {
        let messages = self.current_messages();
        if messages.is_empty() {
            "New Chat".to_string()
        } else {
            library::chat_title(self.current, messages)
        }
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    pub fn settings(&self) -> Settings {
        self.settings
    }

    /// Sends a text message and records the reply.
    ///
    /// Identical prompts (ignoring case and surrounding whitespace) are
    /// answered from the cache. A failed request is recorded as an apology
    /// and is not cached.
    pub async fn send_message(&mut self, text: &str) -> Result<Reply> {
        let (session_id, prompt, context) = self.begin_send(text)?;
        let key = ResponseCache::key_for(&prompt);

        if let Some(cached) = self.cache.lookup(&key) {
            let content = cached.to_string();
            tracing::debug!(target: "cogniverse", "Cache hit for chat {}", session_id);
            return Ok(self.record_reply(session_id, content, ReplySource::Cache));
        }

        let (content, source) = match self.client.complete(&context).await {
            Ok(reply) => {
                self.cache.store(key, reply.clone());
                (reply, ReplySource::Remote)
            }
            Err(err) => Self::failure(err),
        };

        Ok(self.record_reply(session_id, content, source))
    }

    /// Like [`send_message`](Self::send_message), but forwards fragments to
    /// `sink` as they arrive. Streamed replies bypass the cache.
    pub async fn send_message_streaming<F>(&mut self, text: &str, sink: F) -> Result<Reply>
    where
        F: FnMut(&str),
    {
        let (session_id, _prompt, context) = self.begin_send(text)?;

        let (content, source) = match complete_streaming(&*self.client, &context, sink).await {
            Ok(reply) => (reply, ReplySource::Remote),
            Err(err) => Self::failure(err),
        };

        Ok(self.record_reply(session_id, content, source))
    }

    /// Validates input, builds context from the history before this message,
    /// then records the user message.
    fn begin_send(&mut self, text: &str) -> Result<(SessionId, String, Vec<ContextMessage>)> {
        let prompt = text.trim();
        if prompt.is_empty() {
            return Err(CogniverseError::invalid_input("message is empty"));
        }

        let session_id = self.current;
        let context = self.context.build(self.current_messages(), prompt);
        self.sessions.append(session_id, Message::user(prompt));

        Ok((session_id, prompt.to_string(), context))
    }

    fn failure(err: CompletionError) -> (String, ReplySource) {
        tracing::warn!(target: "cogniverse", "Completion failed: {}", err);
        (err.user_message().to_string(), ReplySource::Failed(err))
    }

    fn record_reply(&mut self, session_id: SessionId, content: String, source: ReplySource) -> Reply {
        self.sessions.append(session_id, Message::bot(content.clone()));
        Reply {
            session_id,
            content,
            source,
        }
    }

    /// Starts an empty chat and makes it current.
    pub fn new_chat(&mut self) -> SessionId {
        let id = self.sessions.create();
        self.switch_to(id);
        id
    }

    /// Makes an existing chat current.
    pub fn open_chat(&mut self, id: SessionId) -> Result<&[Message]> {
        if !self.sessions.contains(id) {
            return Err(CogniverseError::not_found("chat", id.to_string()));
        }
        self.switch_to(id);
        Ok(self.current_messages())
    }

    fn switch_to(&mut self, id: SessionId) {
        self.current = id;
        self.sessions.set_last_active(id);
        tracing::debug!(target: "cogniverse", "Switched to chat {}", id);
    }

    /// Reads a file and records it in the current chat.
    pub fn attach_file(&mut self, path: &Path) -> Result<Attachment> {
        let attachment = Attachment::from_path(path)?;
        self.sessions.append(self.current, attachment.to_message());
        tracing::info!(
            target: "cogniverse",
            "Attached {} ({}, {} bytes)",
            attachment.file_name,
            attachment.mime_type,
            attachment.size()
        );
        Ok(attachment)
    }

    /// Records a finished voice recording in the current chat.
    pub fn attach_audio(&mut self, recording: &[u8]) {
        self.sessions.append(self.current, audio_message(recording));
    }

    /// Attaches a file and asks the model about it.
    ///
    /// The analysis prompt goes through the same cache as typed messages;
    /// only the file message and the reply are recorded.
    pub async fn analyze_file(&mut self, path: &Path, prompt: Option<&str>) -> Result<Reply> {
        let session_id = self.current;
        let context_history = self.current_messages().to_vec();
        let attachment = self.attach_file(path)?;

        let prompt = attachment.analysis_prompt(prompt.unwrap_or(DEFAULT_ANALYSIS_PROMPT));
        let key = ResponseCache::key_for(&prompt);
        if let Some(cached) = self.cache.lookup(&key) {
            let content = cached.to_string();
            return Ok(self.record_reply(session_id, content, ReplySource::Cache));
        }

        let context = self.context.build(&context_history, &prompt);
        let (content, source) = match self.client.complete(&context).await {
            Ok(reply) => {
                self.cache.store(key, reply.clone());
                (reply, ReplySource::Remote)
            }
            Err(err) => Self::failure(err),
        };

        Ok(self.record_reply(session_id, content, source))
    }

    pub fn library(&self) -> Vec<ChatSummary> {
        library::library(self.sessions.history())
    }

    pub fn search(&self, term: &str) -> Vec<ChatSummary> {
        library::search(self.sessions.history(), term)
    }

    pub fn stats(&self) -> ConversationStats {
        ConversationStats::collect(self.sessions.history())
    }

    /// Exports a chat (the current one when `id` is `None`).
    pub fn export(&self, id: Option<SessionId>, format: ExportFormat) -> Result<ExportedChat> {
        let id = id.unwrap_or(self.current);
        let messages = self
            .sessions
            .get(id)
            .ok_or_else(|| CogniverseError::not_found("chat", id.to_string()))?;
        export::export_session(id, messages, format)
    }

    /// Imports chats from JSON; colliding ids are overwritten.
    pub fn import(&mut self, json: &str) -> Result<Vec<SessionId>> {
        export::import_all(&mut self.sessions, json)
    }

    /// Deletes every chat and starts a fresh one. Preferences are kept.
    pub fn clear_all(&mut self) -> SessionId {
        self.sessions.clear_all();
        let id = self.new_chat();
        tracing::info!(target: "cogniverse", "All chat history cleared");
        id
    }

    pub fn toggle_theme(&mut self) -> Theme {
        self.set_theme(self.settings.theme.toggled());
        self.settings.theme
    }

    pub fn set_theme(&mut self, theme: Theme) {
        self.settings.theme = theme;
        self.save_settings();
    }

    pub fn set_font_size(&mut self, font_size: FontSize) {
        self.settings.font_size = font_size;
        self.save_settings();
    }

    pub fn set_auto_scroll(&mut self, auto_scroll: bool) {
        self.settings.auto_scroll = auto_scroll;
        self.save_settings();
    }

    fn save_settings(&self) {
        self.sessions.storage().save_settings(&self.settings);
    }

    /// Writes all state to storage.
    pub fn flush(&self) {
        self.sessions.flush();
        self.sessions.storage().save_last_chat_id(self.current);
        self.save_settings();
    }
}
