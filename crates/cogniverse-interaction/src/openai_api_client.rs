//! OpenAiApiClient - REST client for OpenAI-compatible Chat Completions APIs.
//!
//! Works against any endpoint that speaks the `/chat/completions` dialect
//! (OpenAI, OpenRouter, local gateways). Endpoint, model and sampling
//! parameters come from `[completion]` in `config.toml`; the key comes from
//! `secret.json` or `COGNIVERSE_API_KEY`.

use async_trait::async_trait;
use cogniverse_core::completion::sse::sse_text_stream;
use cogniverse_core::completion::{CompletionClient, CompletionError, ContextMessage, TextStream};
use cogniverse_core::config::CompletionConfig;
use cogniverse_core::{CogniverseError, Result};
use futures::TryStreamExt;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};

/// Prompt sent by [`OpenAiApiClient::test_connection`].
pub const CONNECTION_TEST_PROMPT: &str = "Hello, this is a connection test.";

/// Completion client that talks to an OpenAI-compatible HTTP API.
#[derive(Clone)]
pub struct OpenAiApiClient {
    client: Client,
    api_key: String,
    config: CompletionConfig,
}

impl OpenAiApiClient {
    /// Creates a client bounded by `config.timeout_secs`.
    ///
    /// Non-streaming requests must finish within the timeout. Streams only
    /// fail when the gap between two reads exceeds it.
    pub fn new(api_key: impl Into<String>, config: CompletionConfig) -> Result<Self> {
        config.validate()?;
        let client = Client::builder()
            .read_timeout(config.timeout())
            .build()
            .map_err(|err| CogniverseError::config(format!("Failed to build HTTP client: {err}")))?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            config,
        })
    }

    pub fn config(&self) -> &CompletionConfig {
        &self.config
    }

    fn request_body<'a>(
        &'a self,
        messages: &'a [ContextMessage],
        stream: bool,
    ) -> ChatCompletionRequest<'a> {
        ChatCompletionRequest {
            model: &self.config.model,
            messages,
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
            top_p: self.config.top_p,
            frequency_penalty: self.config.frequency_penalty,
            presence_penalty: self.config.presence_penalty,
            stream,
        }
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        let mut builder = builder.header("Authorization", format!("Bearer {}", self.api_key));
        if let Some(referer) = &self.config.referer {
            builder = builder.header("HTTP-Referer", referer);
        }
        if let Some(title) = &self.config.app_title {
            builder = builder.header("X-Title", title);
        }
        builder
    }

    /// POSTs the request and turns a non-2xx answer into `Http`.
    async fn send_request(
        &self,
        body: &ChatCompletionRequest<'_>,
    ) -> std::result::Result<Response, CompletionError> {
        let url = self.config.completions_url();
        tracing::debug!(
            "POST {} model={} messages={} stream={}",
            url,
            body.model,
            body.messages.len(),
            body.stream
        );

        let mut request = self
            .authorized(self.client.post(&url))
            .header("content-type", "application/json")
            .json(body);
        if !body.stream {
            request = request.timeout(self.config.timeout());
        }

        let response = request
            .send()
            .await
            .map_err(map_transport_error)?;

        if !response.status().is_success() {
            let status = response.status();
            let body_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            let err = map_http_error(status, body_text);
            tracing::warn!("Completion request failed: {}", err);
            return Err(err);
        }

        Ok(response)
    }

    /// Fetches key usage and limits from `{base_url}/auth/key`.
    ///
    /// Returns `None` on any failure; the shape of the document is provider
    /// specific and passed through untouched.
    pub async fn usage(&self) -> Option<serde_json::Value> {
        let result = self
            .authorized(self.client.get(self.config.usage_url()))
            .timeout(self.config.timeout())
            .send()
            .await;

        let response = match result {
            Ok(response) if response.status().is_success() => response,
            Ok(response) => {
                tracing::warn!("Usage request returned {}", response.status());
                return None;
            }
            Err(err) => {
                tracing::warn!("Error fetching API usage: {}", err);
                return None;
            }
        };

        match response.json().await {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::warn!("Usage response was not JSON: {}", err);
                None
            }
        }
    }

    /// Sends a fixed prompt and reports whether a reply came back.
    pub async fn test_connection(&self) -> bool {
        match self
            .complete(&[ContextMessage::user(CONNECTION_TEST_PROMPT)])
            .await
        {
            Ok(_) => {
                tracing::info!("API connection test succeeded");
                true
            }
            Err(err) => {
                tracing::warn!("API connection test failed: {}", err);
                false
            }
        }
    }
}

#[async_trait]
impl CompletionClient for OpenAiApiClient {
    async fn complete(
        &self,
        messages: &[ContextMessage],
    ) -> std::result::Result<String, CompletionError> {
        let response = self.send_request(&self.request_body(messages, false)).await?;
        let text = response.text().await.map_err(map_transport_error)?;
        let parsed: ChatCompletionResponse = serde_json::from_str(&text)
            .map_err(|err| CompletionError::parse(format!("Invalid response body: {err}")))?;
        extract_text_response(parsed)
    }

    async fn complete_stream(
        &self,
        messages: &[ContextMessage],
    ) -> std::result::Result<TextStream, CompletionError> {
        let response = self.send_request(&self.request_body(messages, true)).await?;
        let bytes = response.bytes_stream().map_err(map_transport_error);
        Ok(sse_text_stream(bytes))
    }
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ContextMessage],
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    frequency_penalty: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    presence_penalty: Option<f32>,
    stream: bool,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

fn extract_text_response(
    response: ChatCompletionResponse,
) -> std::result::Result<String, CompletionError> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| CompletionError::parse("API returned no content in the response"))
}

fn map_http_error(status: StatusCode, body: String) -> CompletionError {
    let message = serde_json::from_str::<ErrorResponse>(&body)
        .map(|wrapper| wrapper.error.message)
        .unwrap_or(body);
    CompletionError::http(status.as_u16(), message)
}

fn map_transport_error(err: reqwest::Error) -> CompletionError {
    if err.is_timeout() {
        CompletionError::timeout(err.to_string())
    } else if err.is_decode() {
        CompletionError::parse(err.to_string())
    } else {
        CompletionError::network(err.to_string())
    }
}
