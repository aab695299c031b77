// src/llm/provider/claude.rs
// Anthropic text-completion provider; chat turns are collapsed into one prompt

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::time::Instant;
use tracing::debug;

use super::analysis::run_analysis;
use super::conversion::to_completion_prompt;
use super::{ChatMessage, CodeAnalysis, GenerationOptions, ModelAdapter, ProviderDefaults, send_json};
use crate::llm::error::ProviderError;

const ANALYZER_SYSTEM_PROMPT: &str = "You are an expert code analyzer.";

pub struct ClaudeProvider {
    client: Client,
    api_key: String,
    base_url: String,
    version: String,
    defaults: ProviderDefaults,
}

impl ClaudeProvider {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: "https://api.anthropic.com".to_string(),
            version: "2023-06-01".to_string(),
            defaults: ProviderDefaults::new(model),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_sampling(mut self, temperature: f32, max_tokens: u32) -> Self {
        self.defaults.temperature = temperature;
        self.defaults.max_tokens = max_tokens;
        self
    }
}

#[async_trait]
impl ModelAdapter for ClaudeProvider {
    fn name(&self) -> &str {
        "claude"
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
            "prompt": to_completion_prompt(messages),
            "max_tokens_to_sample": max_tokens,
            "temperature": temperature,
        });

        debug!("Claude request: model={}, turns={}", model, messages.len());

        let request = self
            .client
            .post(format!("{}/v1/complete", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", &self.version)
            .json(&body);

        let raw_response = send_json(self.name(), request).await?;

        let completion = raw_response["completion"]
            .as_str()
            .ok_or_else(|| ProviderError::call_failed(self.name(), "no completion in Claude response"))?;

        debug!(
            "Claude response: {} chars in {}ms, stop_reason={:?}",
            completion.len(),
            start.elapsed().as_millis(),
            raw_response["stop_reason"].as_str()
        );

        Ok(completion.trim().to_string())
    }

    async fn analyze_code(
        &self,
        code: &str,
        options: &GenerationOptions,
    ) -> Result<CodeAnalysis, ProviderError> {
        run_analysis(self, ANALYZER_SYSTEM_PROMPT, code, options).await
    }
}
