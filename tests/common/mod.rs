// tests/common/mod.rs
// Scripted in-process adapter shared by the integration tests

#![allow(dead_code)]

use aiden::llm::provider::analysis::parse_analysis;
use aiden::llm::{ChatMessage, CodeAnalysis, GenerationOptions, ModelAdapter, ProviderError};
use async_trait::async_trait;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

pub const CLEAN_REPORT: &str = r#"{
    "potential_issues": [],
    "security_concerns": [],
    "performance_notes": [],
    "improvement_suggestions": ["add a docstring"]
}"#;

pub const BLOCKING_REPORT: &str = r#"{
    "potential_issues": ["removes error handling"],
    "security_concerns": [],
    "performance_notes": [],
    "improvement_suggestions": [],
    "critical_issues": ["removes error handling"]
}"#;

/// Replies from a script and records every call it receives
pub struct ScriptedAdapter {
    name: String,
    reply: Result<String, String>,
    analysis: String,
    delay: Option<Duration>,
    pub chat_calls: AtomicUsize,
    pub analysis_calls: AtomicUsize,
    pub last_messages: Mutex<Vec<ChatMessage>>,
    pub last_code: Mutex<Option<String>>,
}

impl ScriptedAdapter {
    pub fn replying(name: &str, reply: &str) -> Self {
        Self {
            name: name.to_string(),
            reply: Ok(reply.to_string()),
            analysis: CLEAN_REPORT.to_string(),
            delay: None,
            chat_calls: AtomicUsize::new(0),
            analysis_calls: AtomicUsize::new(0),
            last_messages: Mutex::new(Vec::new()),
            last_code: Mutex::new(None),
        }
    }

    pub fn failing(name: &str, message: &str) -> Self {
        Self {
            reply: Err(message.to_string()),
            ..Self::replying(name, "")
        }
    }

    pub fn with_analysis(mut self, report: &str) -> Self {
        self.analysis = report.to_string();
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.chat_calls.load(Ordering::SeqCst) + self.analysis_calls.load(Ordering::SeqCst)
    }

    pub fn seen_messages(&self) -> Vec<ChatMessage> {
        self.last_messages.lock().unwrap().clone()
    }

    pub fn seen_code(&self) -> Option<String> {
        self.last_code.lock().unwrap().clone()
    }

    async fn pause(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl ModelAdapter for ScriptedAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate_response(
        &self,
        messages: &[ChatMessage],
        _options: &GenerationOptions,
    ) -> Result<String, ProviderError> {
        self.chat_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_messages.lock().unwrap() = messages.to_vec();
        self.pause().await;
        self.reply
            .clone()
            .map_err(|message| ProviderError::call_failed(&self.name, message))
    }

    async fn analyze_code(
        &self,
        code: &str,
        _options: &GenerationOptions,
    ) -> Result<CodeAnalysis, ProviderError> {
        self.analysis_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_code.lock().unwrap() = Some(code.to_string());
        self.pause().await;
        if let Err(message) = &self.reply {
            return Err(ProviderError::call_failed(&self.name, message));
        }
        parse_analysis(&self.name, &self.analysis)
    }
}
