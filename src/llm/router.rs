// src/llm/router.rs
// Logical model name -> adapter registry with dispatch by request kind

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::error::ProviderError;
use super::provider::{ChatMessage, CodeAnalysis, GenerationOptions, ModelAdapter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    Chat,
    CodeAnalysis,
}

impl RequestKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestKind::Chat => "chat",
            RequestKind::CodeAnalysis => "code_analysis",
        }
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestKind {
    type Err = RouteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "chat" => Ok(RequestKind::Chat),
            "code_analysis" => Ok(RequestKind::CodeAnalysis),
            other => Err(RouteError::UnsupportedKind(other.to_string())),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RouteError {
    #[error("Model {0} not found")]
    ModelNotFound(String),

    #[error("Unknown request type: {0}")]
    UnsupportedKind(String),

    #[error("{kind} request is missing {field}")]
    MissingPayload { kind: RequestKind, field: &'static str },

    #[error("Model {model} did not respond within {after:?}")]
    TimedOut { model: String, after: Duration },

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// Inputs for one routed request. Chat reads `messages`, code analysis reads `code`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoutePayload {
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub options: GenerationOptions,
}

impl RoutePayload {
    pub fn chat(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            ..Default::default()
        }
    }

    pub fn code(code: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
            ..Default::default()
        }
    }

    pub fn with_options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RouteOutput {
    Text(String),
    Analysis(CodeAnalysis),
}

/// Shared registry of adapters keyed by logical model name.
///
/// Constructed at startup, written by registration, read by every request.
/// Readers clone the adapter handle and release the lock before calling out,
/// so a slow provider never blocks registration.
pub struct ModelRouter {
    models: RwLock<HashMap<String, Arc<dyn ModelAdapter>>>,
    call_timeout: Option<Duration>,
}

impl Default for ModelRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelRouter {
    pub fn new() -> Self {
        Self {
            models: RwLock::new(HashMap::new()),
            call_timeout: None,
        }
    }

    /// Bound every adapter call; expiry surfaces as `RouteError::TimedOut`
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Insert or replace the binding for `name`, returning the replaced adapter
    pub async fn register(
        &self,
        name: impl Into<String>,
        adapter: Arc<dyn ModelAdapter>,
    ) -> Option<Arc<dyn ModelAdapter>> {
        let name = name.into();
        info!("Registering model '{}' -> {}", name, adapter.name());
        let previous = self.models.write().await.insert(name.clone(), adapter);
        if previous.is_some() {
            debug!("Model '{}' replaced an existing registration", name);
        }
        previous
    }

    pub async fn get_model(&self, name: &str) -> Option<Arc<dyn ModelAdapter>> {
        self.models.read().await.get(name).cloned()
    }

    pub async fn resolve(&self, name: &str) -> Result<Arc<dyn ModelAdapter>, RouteError> {
        self.get_model(name)
            .await
            .ok_or_else(|| RouteError::ModelNotFound(name.to_string()))
    }

    pub async fn model_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.models.read().await.keys().cloned().collect();
        names.sort();
        names
    }

    /// Resolve `model`, then dispatch on the textual request kind.
    /// Every rejection happens before the adapter is called.
    pub async fn route(
        &self,
        model: &str,
        kind: &str,
        payload: RoutePayload,
    ) -> Result<RouteOutput, RouteError> {
        let adapter = self.resolve(model).await?;
        let kind = kind.parse::<RequestKind>()?;

        match kind {
            RequestKind::Chat => self
                .run_chat(model, adapter, payload.messages, payload.options)
                .await
                .map(RouteOutput::Text),
            RequestKind::CodeAnalysis => {
                let code = payload
                    .code
                    .ok_or(RouteError::MissingPayload { kind, field: "code" })?;
                self.run_analysis(model, adapter, code, payload.options)
                    .await
                    .map(RouteOutput::Analysis)
            }
        }
    }

    pub async fn chat(
        &self,
        model: &str,
        messages: Vec<ChatMessage>,
        options: GenerationOptions,
    ) -> Result<String, RouteError> {
        let adapter = self.resolve(model).await?;
        self.run_chat(model, adapter, messages, options).await
    }

    pub async fn analyze_code(
        &self,
        model: &str,
        code: impl Into<String>,
        options: GenerationOptions,
    ) -> Result<CodeAnalysis, RouteError> {
        let adapter = self.resolve(model).await?;
        self.run_analysis(model, adapter, code.into(), options).await
    }

    async fn run_chat(
        &self,
        model: &str,
        adapter: Arc<dyn ModelAdapter>,
        messages: Vec<ChatMessage>,
        options: GenerationOptions,
    ) -> Result<String, RouteError> {
        if messages.is_empty() {
            return Err(RouteError::MissingPayload {
                kind: RequestKind::Chat,
                field: "messages",
            });
        }
        debug!("Routing chat request to '{}' ({})", model, adapter.name());
        self.with_deadline(model, RequestKind::Chat, async {
            Ok(adapter.generate_response(&messages, &options).await?)
        })
        .await
    }

    async fn run_analysis(
        &self,
        model: &str,
        adapter: Arc<dyn ModelAdapter>,
        code: String,
        options: GenerationOptions,
    ) -> Result<CodeAnalysis, RouteError> {
        debug!("Routing code_analysis request to '{}' ({})", model, adapter.name());
        self.with_deadline(model, RequestKind::CodeAnalysis, async {
            Ok(adapter.analyze_code(&code, &options).await?)
        })
        .await
    }

    async fn with_deadline<T, F>(
        &self,
        model: &str,
        kind: RequestKind,
        call: F,
    ) -> Result<T, RouteError>
    where
        F: Future<Output = Result<T, RouteError>>,
    {
        let result = match self.call_timeout {
            Some(after) => match tokio::time::timeout(after, call).await {
                Ok(result) => result,
                Err(_) => {
                    warn!("Model '{}' {} request timed out after {:?}", model, kind, after);
                    return Err(RouteError::TimedOut {
                        model: model.to_string(),
                        after,
                    });
                }
            },
            None => call.await,
        };

        if let Err(e) = &result {
            warn!("Model '{}' {} request failed: {}", model, kind, e);
        }
        result
    }
}
