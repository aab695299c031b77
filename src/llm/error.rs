// src/llm/error.rs
// Adapter-level failures shared by every provider

use std::fmt::Display;

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// Transport, auth, rate limit, non-2xx status or a response missing its payload
    #[error("{provider} API call failed: {message}")]
    CallFailed { provider: String, message: String },

    /// The provider answered but the text did not decode as the expected structure
    #[error("{provider} response could not be parsed: {message}")]
    ResponseParseFailed { provider: String, message: String },
}

impl ProviderError {
    pub fn call_failed(provider: &str, err: impl Display) -> Self {
        Self::CallFailed {
            provider: provider.to_string(),
            message: err.to_string(),
        }
    }

    pub fn parse_failed(provider: &str, err: impl Display) -> Self {
        Self::ResponseParseFailed {
            provider: provider.to_string(),
            message: err.to_string(),
        }
    }

    pub fn provider(&self) -> &str {
        match self {
            Self::CallFailed { provider, .. } | Self::ResponseParseFailed { provider, .. } => {
                provider
            }
        }
    }
}
