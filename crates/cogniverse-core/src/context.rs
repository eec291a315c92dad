//! Builds the role-tagged context submitted with each completion request.

use crate::completion::ContextMessage;
use crate::session::{Message, Sender};

/// Instruction sent as the first entry of every request.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are Cogniverse, a helpful, intelligent, and friendly AI assistant. Provide clear, accurate, and engaging responses. Be conversational but informative.";

/// How many of the most recent stored messages are considered.
pub const DEFAULT_HISTORY_LIMIT: usize = 10;

/// Assembles `[system, recent history..., new user message]`.
///
/// The window is taken over the last `history_limit` stored messages, then
/// non-text messages inside it are dropped, so attachments use up window
/// slots without contributing content. Truncation is by count only.
#[derive(Debug, Clone)]
pub struct ContextBuilder {
    system_prompt: String,
    history_limit: usize,
}

impl ContextBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub fn history_limit(&self) -> usize {
        self.history_limit
    }

    /// Builds the context for `new_message` given the session's prior messages.
    pub fn build(&self, history: &[Message], new_message: &str) -> Vec<ContextMessage> {
        let start = history.len().saturating_sub(self.history_limit);
        let recent = &history[start..];

        let mut context = Vec::with_capacity(recent.len() + 2);
        context.push(ContextMessage::system(self.system_prompt.clone()));
        context.extend(recent.iter().filter(|m| m.is_text()).map(|m| match m.sender {
            Sender::User => ContextMessage::user(m.content.clone()),
            Sender::Bot => ContextMessage::assistant(m.content.clone()),
        }));
        context.push(ContextMessage::user(new_message));
        context
    }
}

impl Default for ContextBuilder {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::ChatRole;

    fn alternating(n: usize) -> Vec<Message> {
        (0..n)
            .map(|i| {
                if i % 2 == 0 {
                    Message::user(format!("q{i}"))
                } else {
                    Message::bot(format!("a{i}"))
                }
            })
            .collect()
    }

    #[test]
    fn fifteen_prior_messages_yield_twelve_entries() {
        let context = ContextBuilder::new().build(&alternating(15), "next");

        assert_eq!(context.len(), 12);
        assert_eq!(context[0].role, ChatRole::System);
        assert_eq!(context[0].content, DEFAULT_SYSTEM_PROMPT);
        // Oldest retained message is index 5.
        assert_eq!(context[1].content, "a5");
        assert_eq!(context[1].role, ChatRole::Assistant);
        assert_eq!(context[10].content, "q14");
        assert_eq!(context[10].role, ChatRole::User);
        assert_eq!(context[11], ContextMessage::user("next"));
    }

    #[test]
    fn short_history_is_included_whole() {
        let context = ContextBuilder::new().build(&alternating(3), "next");
        assert_eq!(context.len(), 5);
        let contents: Vec<&str> = context.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(&contents[1..], &["q0", "a1", "q2", "next"][..]);
    }

    #[test]
    fn empty_history_gives_system_and_message() {
        let context = ContextBuilder::new().build(&[], "hello");
        assert_eq!(context.len(), 2);
    }

    #[test]
    fn attachments_take_window_slots_but_are_dropped() {
        let mut history = alternating(10);
        history.push(Message::file("data:image/png;base64,AA==", "cat.png"));
        history.push(Message::audio("data:audio/mpeg;base64,AA=="));

        let context = ContextBuilder::new().build(&history, "what was that?");
        // Window = messages 2..12, of which two are attachments.
        assert_eq!(context.len(), 1 + 8 + 1);
        assert_eq!(context[1].content, "q2");
    }

    #[test]
    fn custom_limit_and_prompt() {
        let builder = ContextBuilder::new()
            .with_history_limit(2)
            .with_system_prompt("be brief");
        let context = builder.build(&alternating(6), "x");
        assert_eq!(context.len(), 4);
        assert_eq!(context[0].content, "be brief");
        assert_eq!(context[1].content, "q4");
    }
}
