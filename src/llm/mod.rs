// src/llm/mod.rs
// Provider adapters and the logical-name router in front of them

pub mod error;
pub mod provider;
pub mod router;

pub use error::ProviderError;
pub use provider::{
    ChatMessage, CodeAnalysis, Finding, GenerationOptions, ModelAdapter, Role,
    claude::ClaudeProvider, openai::OpenAiProvider,
};
pub use router::{ModelRouter, RequestKind, RouteError, RouteOutput, RoutePayload};
