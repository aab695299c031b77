// src/llm/provider/mod.rs
// Model adapter trait and the message/option types shared by all providers

use async_trait::async_trait;
use reqwest::RequestBuilder;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::ProviderError;

pub mod analysis;
pub mod claude;
pub mod conversion;
pub mod openai;

pub use analysis::{CodeAnalysis, Finding};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// Message format for all providers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Per-call overrides. Unset fields fall back to the adapter's defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationOptions {
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl GenerationOptions {
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// Model variant and sampling settings an adapter uses when a call leaves them unset
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderDefaults {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl ProviderDefaults {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            temperature: 0.7,
            max_tokens: 2000,
        }
    }

    pub fn resolve<'a>(&'a self, options: &'a GenerationOptions) -> (&'a str, f32, u32) {
        (
            options.model.as_deref().unwrap_or(&self.model),
            options.temperature.unwrap_or(self.temperature),
            options.max_tokens.unwrap_or(self.max_tokens),
        )
    }
}

/// Universal model adapter interface
#[async_trait]
pub trait ModelAdapter: Send + Sync {
    /// Provider name for logging and error attribution
    fn name(&self) -> &str;

    /// Chat completion over role-tagged turns
    async fn generate_response(
        &self,
        messages: &[ChatMessage],
        options: &GenerationOptions,
    ) -> Result<String, ProviderError>;

    /// Structured review of a piece of source code
    async fn analyze_code(
        &self,
        code: &str,
        options: &GenerationOptions,
    ) -> Result<CodeAnalysis, ProviderError>;
}

/// Send a JSON request and decode the JSON body. Every failure is a `CallFailed`.
pub(crate) async fn send_json(
    provider: &str,
    request: RequestBuilder,
) -> Result<Value, ProviderError> {
    let response = request
        .send()
        .await
        .map_err(|e| ProviderError::call_failed(provider, e))?;

    if !response.status().is_success() {
        let status = response.status();
        let error_text = response.text().await.unwrap_or_default();
        return Err(ProviderError::call_failed(
            provider,
            format!("{}: {}", status, error_text),
        ));
    }

    response
        .json::<Value>()
        .await
        .map_err(|e| ProviderError::call_failed(provider, format!("malformed response body: {}", e)))
}
