//! Offline responder used when no API key is configured.

use async_trait::async_trait;
use cogniverse_core::completion::{
    ChatRole, CompletionClient, CompletionError, ContextMessage, TextStream,
};
use futures::StreamExt;
use rand::Rng;
use std::time::Duration;

const GREETING_REPLY: &str = "Hello! I'm Cogniverse, your AI assistant. How can I help you today?";
const WELLBEING_REPLY: &str = "I'm doing well, thank you for asking! I'm here and ready to assist you with any questions or tasks you have.";
const HELP_REPLY: &str = "I can help you with a wide variety of tasks including:\n\n\
• Answering questions and providing information\n\
• Writing and editing text\n\
• Solving problems and offering suggestions\n\
• Creative tasks like storytelling\n\
• Technical assistance and coding help\n\
• And much more!\n\n\
What would you like help with today?";

const DEFAULT_REPLIES: [&str; 5] = [
    "That's an interesting question! Let me think about that for you.",
    "I understand what you're asking. Here's my perspective on that.",
    "Thanks for sharing that with me. I'd be happy to help you explore this topic.",
    "That's a great point! Let me provide you with some insights.",
    "I appreciate you bringing this up. Here's what I think about it.",
];

/// Appended to every non-keyword reply.
pub const DEMO_NOTE: &str =
    "Note: This is a demo response. Please configure your API key for full functionality.";

/// Canned-reply [`CompletionClient`].
///
/// Matching is by lowercase substring on the latest user message, so
/// "this" counts as a greeting.
#[derive(Debug, Clone)]
pub struct DemoClient {
    base_delay: Duration,
    jitter: Duration,
}

impl DemoClient {
    /// Simulates network latency of 1.5 to 2.5 seconds per reply.
    pub fn new() -> Self {
        Self {
            base_delay: Duration::from_millis(1500),
            jitter: Duration::from_millis(1000),
        }
    }

    /// Replies without any delay.
    pub fn instant() -> Self {
        Self {
            base_delay: Duration::ZERO,
            jitter: Duration::ZERO,
        }
    }

    /// The canned reply for `message`.
    pub fn reply_for(message: &str) -> String {
        let message = message.to_lowercase();

        if ["hello", "hi", "hey"].iter().any(|k| message.contains(k)) {
            return GREETING_REPLY.to_string();
        }
        if message.contains("how are you") {
            return WELLBEING_REPLY.to_string();
        }
        if message.contains("help") || message.contains("what can you do") {
            return HELP_REPLY.to_string();
        }

        let pick = rand::thread_rng().gen_range(0..DEFAULT_REPLIES.len());
        format!("{}\n\n{}", DEFAULT_REPLIES[pick], DEMO_NOTE)
    }

    fn delay(&self) -> Duration {
        if self.jitter.is_zero() {
            return self.base_delay;
        }
        let jitter_ms = rand::thread_rng().gen_range(0..self.jitter.as_millis() as u64);
        self.base_delay + Duration::from_millis(jitter_ms)
    }

    fn reply_to(messages: &[ContextMessage]) -> String {
        let latest = messages
            .iter()
            .rev()
            .find(|m| m.role == ChatRole::User)
            .map(|m| m.content.as_str())
            .unwrap_or_default();
        Self::reply_for(latest)
    }
}

impl Default for DemoClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CompletionClient for DemoClient {
    async fn complete(&self, messages: &[ContextMessage]) -> Result<String, CompletionError> {
        let reply = Self::reply_to(messages);
        let delay = self.delay();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        Ok(reply)
    }

    /// Emits the reply word by word.
    async fn complete_stream(
        &self,
        messages: &[ContextMessage],
    ) -> Result<TextStream, CompletionError> {
        let reply = self.complete(messages).await?;
        let words: Vec<Result<String, CompletionError>> = reply
            .split_inclusive(' ')
            .map(|w| Ok(w.to_string()))
            .collect();
        Ok(futures::stream::iter(words).boxed())
    }
}
