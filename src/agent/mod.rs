// src/agent/mod.rs
// Conversational front end: rolling history, routed chat, reviewed self-modification

pub mod modifier;

pub use modifier::{CodeModifier, ModificationReport, ModifyError};

use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::llm::{ChatMessage, CodeAnalysis, GenerationOptions, ModelRouter, RouteError};

/// Turns kept in memory when no limit is configured
pub const DEFAULT_HISTORY_LIMIT: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnRole {
    User,
    Assistant,
    /// Failed request; kept for the record, never replayed to a model
    Error,
}

#[derive(Debug, Clone, Serialize)]
pub struct Turn {
    pub role: TurnRole,
    pub content: String,
    pub timestamp_ms: u64,
}

impl Turn {
    fn new(role: TurnRole, content: impl Into<String>) -> Self {
        let timestamp_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default();
        Self {
            role,
            content: content.into(),
            timestamp_ms,
        }
    }

    fn as_message(&self) -> Option<ChatMessage> {
        match self.role {
            TurnRole::User => Some(ChatMessage::user(&self.content)),
            TurnRole::Assistant => Some(ChatMessage::assistant(&self.content)),
            TurnRole::Error => None,
        }
    }
}

/// Per-file result of `Agent::analyze_paths`
#[derive(Debug)]
pub struct PathAnalysis {
    pub path: PathBuf,
    pub result: Result<CodeAnalysis, ModifyError>,
}

pub struct Agent {
    router: Arc<ModelRouter>,
    modifier: CodeModifier,
    system_prompt: String,
    history_window: usize,
    history_limit: usize,
    history: Mutex<Vec<Turn>>,
}

impl Agent {
    pub fn new(
        router: Arc<ModelRouter>,
        modifier: CodeModifier,
        system_prompt: impl Into<String>,
        history_window: usize,
    ) -> Self {
        Self {
            router,
            modifier,
            system_prompt: system_prompt.into(),
            history_window,
            history_limit: DEFAULT_HISTORY_LIMIT.max(history_window),
            history: Mutex::new(Vec::new()),
        }
    }

    /// Oldest turns beyond `limit` are dropped; never fewer than the replay window
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit.max(self.history_window).max(1);
        self
    }

    pub fn router(&self) -> &Arc<ModelRouter> {
        &self.router
    }

    pub fn modifier(&self) -> &CodeModifier {
        &self.modifier
    }

    /// Record `message`, send the system prompt plus the latest window of
    /// conversation to `model`, and record the reply (or the failure).
    pub async fn process_request(&self, message: &str, model: &str) -> Result<String, RouteError> {
        let messages = {
            let mut history = self.history.lock().await;
            self.record(&mut history, Turn::new(TurnRole::User, message));
            self.context_messages(&history)
        };
        debug!("Sending {} message(s) to '{}'", messages.len(), model);

        match self
            .router
            .chat(model, messages, GenerationOptions::default())
            .await
        {
            Ok(reply) => {
                let mut history = self.history.lock().await;
                self.record(&mut history, Turn::new(TurnRole::Assistant, reply.clone()));
                Ok(reply)
            }
            Err(e) => {
                warn!("Request to '{}' failed: {}", model, e);
                let mut history = self.history.lock().await;
                self.record(
                    &mut history,
                    Turn::new(TurnRole::Error, format!("Error processing request: {}", e)),
                );
                Err(e)
            }
        }
    }

    pub async fn execute_code_modification(
        &self,
        path: &Path,
        proposed: &str,
    ) -> Result<ModificationReport, ModifyError> {
        self.modifier.execute_modification(path, proposed).await
    }

    /// Route each file's current contents to `model` for code analysis.
    /// One file failing does not stop the others.
    pub async fn analyze_paths(&self, paths: &[PathBuf], model: &str) -> Vec<PathAnalysis> {
        let mut results = Vec::with_capacity(paths.len());
        for path in paths {
            let result = self.analyze_path(path, model).await;
            if let Err(e) = &result {
                warn!("Analysis of {} failed: {}", path.display(), e);
            }
            results.push(PathAnalysis {
                path: path.clone(),
                result,
            });
        }
        results
    }

    async fn analyze_path(&self, path: &Path, model: &str) -> Result<CodeAnalysis, ModifyError> {
        let code = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ModifyError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(self
            .router
            .analyze_code(model, code, GenerationOptions::default())
            .await?)
    }

    pub async fn history(&self) -> Vec<Turn> {
        self.history.lock().await.clone()
    }

    fn record(&self, history: &mut Vec<Turn>, turn: Turn) {
        history.push(turn);
        if history.len() > self.history_limit {
            let excess = history.len() - self.history_limit;
            history.drain(..excess);
        }
    }

    fn context_messages(&self, history: &[Turn]) -> Vec<ChatMessage> {
        let replayable: Vec<ChatMessage> = history.iter().filter_map(Turn::as_message).collect();
        let start = replayable.len().saturating_sub(self.history_window.max(1));

        let mut messages = Vec::with_capacity(replayable.len() - start + 1);
        messages.push(ChatMessage::system(&self.system_prompt));
        messages.extend(replayable.into_iter().skip(start));
        messages
    }
}
