//! Remote completion contract.
//!
//! The trait lives here so the session and controller layers stay
//! independent of any HTTP stack; `cogniverse-interaction` provides the
//! implementations.
//!
//! # Module Structure
//!
//! - `error`: `CompletionError` and its user-facing messages
//! - `message`: `ChatRole`, `ContextMessage`
//! - `sse`: server-sent-event framing for streamed replies

mod error;
mod message;
pub mod sse;

pub use error::CompletionError;
pub use message::{ChatRole, ContextMessage};

use async_trait::async_trait;
use futures::StreamExt;
use futures::stream::BoxStream;

/// Lazy, finite, non-restartable sequence of reply fragments.
pub type TextStream = BoxStream<'static, Result<String, CompletionError>>;

/// A remote chat-completion service.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Sends the context and waits for the whole reply.
    async fn complete(&self, messages: &[ContextMessage]) -> Result<String, CompletionError>;

    /// Sends the context and returns the reply as it arrives.
    ///
    /// HTTP and transport failures that happen before the first byte are
    /// returned here; later transport failures surface as stream items.
    async fn complete_stream(
        &self,
        messages: &[ContextMessage],
    ) -> Result<TextStream, CompletionError>;
}

/// Drives a streamed completion, forwarding each fragment to `sink` in
/// arrival order, and returns the concatenated reply.
pub async fn complete_streaming<C, F>(
    client: &C,
    messages: &[ContextMessage],
    mut sink: F,
) -> Result<String, CompletionError>
where
    C: CompletionClient + ?Sized,
    F: FnMut(&str),
{
    let mut stream = client.complete_stream(messages).await?;
    let mut reply = String::new();

    while let Some(fragment) = stream.next().await {
        let fragment = fragment?;
        if fragment.is_empty() {
            continue;
        }
        sink(&fragment);
        reply.push_str(&fragment);
    }

    tracing::debug!("Stream completed: final_len={}", reply.len());
    Ok(reply)
}
