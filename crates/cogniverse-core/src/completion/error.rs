//! Completion failure taxonomy.

use thiserror::Error;

const NETWORK_MESSAGE: &str = "I'm having trouble connecting to the AI service. Please check your internet connection and try again.";
const TIMEOUT_MESSAGE: &str =
    "The request took too long to process. Please try again with a shorter message.";
const AUTH_MESSAGE: &str = "Authentication error. Please check your API key configuration.";
const RATE_LIMIT_MESSAGE: &str =
    "I'm receiving too many requests right now. Please wait a moment and try again.";
const UNAVAILABLE_MESSAGE: &str =
    "The AI service is temporarily unavailable. Please try again in a few moments.";
const GENERIC_MESSAGE: &str = "I encountered an unexpected error. Please try rephrasing your message or contact support if the problem persists.";

/// Failure of a remote completion request.
///
/// Each variant is raised by the layer that observed it: the transport
/// raises `Network`/`Timeout`, the HTTP layer raises `Http`, and body
/// decoding raises `Parse`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompletionError {
    /// Connection could not be established or broke mid-request.
    #[error("Network error: {0}")]
    Network(String),

    /// The configured request timeout elapsed.
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// The endpoint answered with a non-2xx status.
    #[error("API error: {status} - {message}")]
    Http { status: u16, message: String },

    /// The response body was not the expected JSON shape.
    #[error("Failed to parse completion response: {0}")]
    Parse(String),
}

impl CompletionError {
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network(message.into())
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::Timeout(message.into())
    }

    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self::Http {
            status,
            message: message.into(),
        }
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse(message.into())
    }

    /// HTTP status code, if the endpoint produced one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Fixed, user-readable text shown in place of a reply.
    ///
    /// Raw error details never reach the conversation; they go to the log.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Network(_) => NETWORK_MESSAGE,
            Self::Timeout(_) => TIMEOUT_MESSAGE,
            Self::Http { status, .. } => match status {
                401 | 403 => AUTH_MESSAGE,
                429 => RATE_LIMIT_MESSAGE,
                500 | 502 | 503 => UNAVAILABLE_MESSAGE,
                _ => GENERIC_MESSAGE,
            },
            Self::Parse(_) => GENERIC_MESSAGE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limit_maps_to_rate_limit_message() {
        let err = CompletionError::http(429, "Too Many Requests");
        assert_eq!(err.status(), Some(429));
        assert_eq!(err.user_message(), RATE_LIMIT_MESSAGE);
    }

    #[test]
    fn auth_statuses_share_a_message() {
        assert_eq!(CompletionError::http(401, "").user_message(), AUTH_MESSAGE);
        assert_eq!(CompletionError::http(403, "").user_message(), AUTH_MESSAGE);
    }

    #[test]
    fn server_errors_map_to_unavailable() {
        for status in [500, 502, 503] {
            assert_eq!(
                CompletionError::http(status, "").user_message(),
                UNAVAILABLE_MESSAGE
            );
        }
        assert_eq!(CompletionError::http(504, "").user_message(), GENERIC_MESSAGE);
    }

    #[test]
    fn classification_ignores_message_text() {
        // A parse failure mentioning "timeout" is still a parse failure.
        let err = CompletionError::parse("timeout field missing");
        assert_eq!(err.user_message(), GENERIC_MESSAGE);

        let err = CompletionError::http(400, "rate limit exceeded on 429 path");
        assert_eq!(err.user_message(), GENERIC_MESSAGE);
    }

    #[test]
    fn transport_failures_have_dedicated_messages() {
        assert_eq!(CompletionError::network("offline").user_message(), NETWORK_MESSAGE);
        assert_eq!(CompletionError::timeout("30s").user_message(), TIMEOUT_MESSAGE);
    }
}
