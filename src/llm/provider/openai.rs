// src/llm/provider/openai.rs
// OpenAI chat-completions provider (also serves OpenAI-compatible endpoints)

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::time::Instant;
use tracing::debug;

use super::analysis::run_analysis;
use super::conversion::to_openai_messages;
use super::{ChatMessage, CodeAnalysis, GenerationOptions, ModelAdapter, ProviderDefaults, send_json};
use crate::llm::error::ProviderError;

const ANALYZER_SYSTEM_PROMPT: &str =
    "You are a code analysis expert. Provide detailed, actionable insights.";

pub struct OpenAiProvider {
    client: Client,
    api_key: String,
    base_url: String,
    defaults: ProviderDefaults,
}

impl OpenAiProvider {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: "https://api.openai.com".to_string(),
            defaults: ProviderDefaults::new(model),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_sampling(mut self, temperature: f32, max_tokens: u32) -> Self {
        self.defaults.temperature = temperature;
        self.defaults.max_tokens = max_tokens;
        self
    }
}

#[async_trait]
impl ModelAdapter for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn generate_response(
        &self,
        messages: &[ChatMessage],
        options: &GenerationOptions,
    ) -> Result<String, ProviderError> {
        let start = Instant::now();
        let (model, temperature, max_tokens) = self.defaults.resolve(options);

        let body = json!({
            "model": model,
            "messages": to_openai_messages(messages),
            "temperature": temperature,
            "max_tokens": max_tokens,
        });

        debug!("OpenAI request: model={}, turns={}", model, messages.len());

        let request = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body);

        let raw_response = send_json(self.name(), request).await?;

        let content = raw_response["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| ProviderError::call_failed(self.name(), "no content in OpenAI response"))?;

        debug!(
            "OpenAI response: {} chars in {}ms, finish_reason={:?}",
            content.len(),
            start.elapsed().as_millis(),
            raw_response["choices"][0]["finish_reason"].as_str()
        );

        Ok(content.to_string())
    }

    async fn analyze_code(
        &self,
        code: &str,
        options: &GenerationOptions,
    ) -> Result<CodeAnalysis, ProviderError> {
        run_analysis(self, ANALYZER_SYSTEM_PROMPT, code, options).await
    }
}
