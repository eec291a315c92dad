//! Application configuration model.
//!
//! `config.toml` maps onto [`AppConfig`]; every field has a default so a
//! partial (or missing) file is valid. Credentials live separately in
//! `secret.json` ([`SecretConfig`]) and are never written to the log.

use crate::cache::DEFAULT_CACHE_CAPACITY;
use crate::context::{ContextBuilder, DEFAULT_HISTORY_LIMIT, DEFAULT_SYSTEM_PROMPT};
use crate::error::{CogniverseError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root of `config.toml`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub completion: CompletionConfig,
    pub cache: CacheConfig,
    pub context: ContextConfig,
}

impl AppConfig {
    /// Parses `config.toml` content. Blank input yields the defaults.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: AppConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Rejects values the completion client cannot use.
    pub fn validate(&self) -> Result<()> {
        self.completion.validate()?;
        if self.cache.capacity == 0 {
            return Err(CogniverseError::config("cache.capacity must be at least 1"));
        }
        Ok(())
    }

    /// Context builder configured from the `[context]` table.
    pub fn context_builder(&self) -> ContextBuilder {
        ContextBuilder::new()
            .with_system_prompt(self.context.system_prompt.clone())
            .with_history_limit(self.context.history_limit)
    }
}

/// `[completion]` table: endpoint and sampling parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletionConfig {
    /// Base URL of an OpenAI-compatible API; `/chat/completions` is appended.
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f32>,
    pub timeout_secs: u64,
    /// Sent as `HTTP-Referer` (OpenRouter attribution).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referer: Option<String>,
    /// Sent as `X-Title`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_title: Option<String>,
}

impl CompletionConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn validate(&self) -> Result<()> {
        if self.base_url.trim().is_empty() {
            return Err(CogniverseError::config("completion.base_url is not set"));
        }
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(CogniverseError::config(format!(
                "completion.base_url must be an http(s) URL, got '{}'",
                self.base_url
            )));
        }
        if self.model.trim().is_empty() {
            return Err(CogniverseError::config("completion.model is not set"));
        }
        if self.timeout_secs == 0 {
            return Err(CogniverseError::config(
                "completion.timeout_secs must be at least 1",
            ));
        }
        Ok(())
    }

    /// `{base_url}/chat/completions`, tolerating a trailing slash.
    pub fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }

    /// `{base_url}/auth/key`, the key usage endpoint.
    pub fn usage_url(&self) -> String {
        format!("{}/auth/key", self.base_url.trim_end_matches('/'))
    }
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            base_url: "https://openrouter.ai/api/v1".to_string(),
            model: "openai/gpt-4".to_string(),
            max_tokens: 1000,
            temperature: 0.7,
            top_p: Some(0.9),
            frequency_penalty: Some(0.1),
            presence_penalty: Some(0.1),
            timeout_secs: 30,
            referer: None,
            app_title: Some("Cogniverse Chat App".to_string()),
        }
    }
}

/// `[cache]` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

/// `[context]` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    pub history_limit: usize,
    pub system_prompt: String,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            history_limit: DEFAULT_HISTORY_LIMIT,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }
}

/// Contents of `secret.json`.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretConfig {
    #[serde(default)]
    pub api_key: Option<String>,
}

impl SecretConfig {
    /// The key, if one is set and not a placeholder.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty() && *k != "your-api-key-here")
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key().is_some()
    }
}

impl std::fmt::Debug for SecretConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}
