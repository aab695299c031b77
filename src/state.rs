// src/state.rs
// Shared application state built once from configuration

use std::sync::Arc;
use tracing::{info, warn};

use crate::agent::{Agent, CodeModifier};
use crate::config::AidenConfig;
use crate::file_system::GuardedMutator;
use crate::llm::{ClaudeProvider, ModelRouter, OpenAiProvider};
use crate::safety::SafetyPolicy;

/// Logical names bound to the OpenAI adapter, each naming its own model
pub const OPENAI_MODELS: &[&str] = &["gpt-4", "gpt-3.5-turbo"];

/// Logical name bound to the Claude adapter
pub const CLAUDE_MODEL_NAME: &str = "claude";

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AidenConfig>,
    pub router: Arc<ModelRouter>,
    pub agent: Arc<Agent>,
}

pub async fn create_app_state(config: AidenConfig) -> AppState {
    let router = Arc::new(ModelRouter::new().with_timeout(config.provider_timeout()));
    let registered = register_configured_models(&router, &config).await;
    if registered == 0 {
        warn!("No provider credentials configured; every routed request will fail with 'not found'");
    }

    let policy = SafetyPolicy::default().with_denied_modules(config.denied_modules.iter().cloned());
    let modifier = CodeModifier::new(
        router.clone(),
        GuardedMutator::new(policy),
        config.analysis_model.clone(),
    );
    let agent = Arc::new(
        Agent::new(
            router.clone(),
            modifier,
            config.system_prompt.clone(),
            config.history_window,
        )
        .with_history_limit(config.history_limit),
    );

    AppState {
        config: Arc::new(config),
        router,
        agent,
    }
}

/// Register every adapter whose credentials are present; returns how many were bound
pub async fn register_configured_models(router: &ModelRouter, config: &AidenConfig) -> usize {
    let mut count = 0;

    if let Some(key) = &config.openai_api_key {
        for model in OPENAI_MODELS {
            let adapter = OpenAiProvider::new(key.clone(), model.to_string())
                .with_base_url(&config.openai_base_url)
                .with_sampling(config.temperature, config.max_tokens);
            router.register(*model, Arc::new(adapter)).await;
            count += 1;
        }
    } else {
        info!("OPENAI_API_KEY not set, skipping OpenAI models");
    }

    if let Some(key) = &config.anthropic_api_key {
        let adapter = ClaudeProvider::new(key.clone(), config.claude_model.clone())
            .with_base_url(&config.anthropic_base_url)
            .with_version(&config.anthropic_version)
            .with_sampling(config.temperature, config.max_tokens);
        router.register(CLAUDE_MODEL_NAME, Arc::new(adapter)).await;
        count += 1;
    } else {
        info!("ANTHROPIC_API_KEY not set, skipping Claude");
    }

    count
}
