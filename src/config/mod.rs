// src/config/mod.rs
// Load settings from .env and the process environment with typed defaults

use serde::Deserialize;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are Aiden, a self-improving AI agent. \
You can analyze and modify code, including your own implementation.";

#[derive(Debug, Clone, Deserialize)]
pub struct AidenConfig {
    // ── Provider credentials
    pub openai_api_key: Option<String>,
    pub anthropic_api_key: Option<String>,

    // ── Provider endpoints
    pub openai_base_url: String,
    pub anthropic_base_url: String,
    pub anthropic_version: String,
    pub claude_model: String,

    // ── Generation defaults
    pub temperature: f32,
    pub max_tokens: u32,
    pub provider_timeout: u64,

    // ── Routing
    pub chat_model: String,
    pub analysis_model: String,

    // ── Agent
    pub history_window: usize,
    pub history_limit: usize,
    pub system_prompt: String,

    // ── Safety
    pub denied_modules: Vec<String>,

    // ── Logging
    pub log_level: String,
}

// Numeric values may carry trailing `# comments` from .env files.
fn env_var_or<T>(key: &str, default: T) -> T
where
    T: FromStr,
{
    match std::env::var(key) {
        Ok(val) => {
            let clean_val = val.split('#').next().unwrap_or("").trim();
            match clean_val.parse::<T>() {
                Ok(parsed) => parsed,
                Err(_) => {
                    eprintln!("Config: {} = '{}' (parse failed, using default)", key, val);
                    default
                }
            }
        }
        Err(_) => default,
    }
}

/// Single-word strings (URLs, model names): a `#` only starts a comment after
/// whitespace, so URL fragments survive.
fn word_var(key: &str, default: &str) -> String {
    match std::env::var(key) {
        Ok(val) => {
            let end = val
                .char_indices()
                .find(|&(i, c)| c == '#' && (i == 0 || val[..i].ends_with(char::is_whitespace)))
                .map_or(val.len(), |(i, _)| i);
            let clean_val = val[..end].trim();
            if clean_val.is_empty() {
                default.to_string()
            } else {
                clean_val.to_string()
            }
        }
        Err(_) => default.to_string(),
    }
}

/// Free text is taken as-is apart from surrounding whitespace.
fn text_var(key: &str, default: &str) -> String {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// Secrets are read verbatim and never echoed.
fn secret_var(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn list_var(key: &str) -> Vec<String> {
    word_var(key, "")
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

impl AidenConfig {
    pub fn from_env() -> Self {
        if dotenvy::dotenv().is_err() {
            eprintln!("Warning: .env file not found. Using environment variables and defaults.");
        }

        Self {
            openai_api_key: secret_var("OPENAI_API_KEY"),
            anthropic_api_key: secret_var("ANTHROPIC_API_KEY"),
            openai_base_url: word_var("OPENAI_BASE_URL", "https://api.openai.com"),
            anthropic_base_url: word_var("ANTHROPIC_BASE_URL", "https://api.anthropic.com"),
            anthropic_version: word_var("ANTHROPIC_VERSION", "2023-06-01"),
            claude_model: word_var("AIDEN_CLAUDE_MODEL", "claude-2"),
            temperature: env_var_or("AIDEN_TEMPERATURE", 0.7),
            max_tokens: env_var_or("AIDEN_MAX_TOKENS", 2000),
            provider_timeout: env_var_or("AIDEN_PROVIDER_TIMEOUT", 60),
            chat_model: word_var("AIDEN_CHAT_MODEL", "gpt-4"),
            analysis_model: word_var("AIDEN_ANALYSIS_MODEL", "gpt-4"),
            history_window: env_var_or("AIDEN_HISTORY_WINDOW", 5),
            history_limit: env_var_or("AIDEN_HISTORY_LIMIT", 200),
            system_prompt: text_var("AIDEN_SYSTEM_PROMPT", DEFAULT_SYSTEM_PROMPT),
            denied_modules: list_var("AIDEN_DENIED_MODULES"),
            log_level: word_var("AIDEN_LOG_LEVEL", "info"),
        }
    }

    /// Per-call provider deadline; `None` when disabled with 0
    pub fn provider_timeout(&self) -> Option<Duration> {
        (self.provider_timeout > 0).then(|| Duration::from_secs(self.provider_timeout))
    }

}

impl Default for AidenConfig {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            anthropic_api_key: None,
            openai_base_url: "https://api.openai.com".to_string(),
            anthropic_base_url: "https://api.anthropic.com".to_string(),
            anthropic_version: "2023-06-01".to_string(),
            claude_model: "claude-2".to_string(),
            temperature: 0.7,
            max_tokens: 2000,
            provider_timeout: 60,
            chat_model: "gpt-4".to_string(),
            analysis_model: "gpt-4".to_string(),
            history_window: 5,
            history_limit: 200,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            denied_modules: Vec::new(),
            log_level: "info".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = AidenConfig::default();

        assert_eq!(config.chat_model, "gpt-4");
        assert_eq!(config.claude_model, "claude-2");
        assert_eq!(config.max_tokens, 2000);
        assert_eq!(config.history_window, 5);
        assert!(config.openai_api_key.is_none());
    }

    #[test]
    fn test_provider_timeout() {
        let mut config = AidenConfig::default();
        assert_eq!(config.provider_timeout(), Some(Duration::from_secs(60)));

        config.provider_timeout = 0;
        assert_eq!(config.provider_timeout(), None);
    }

    #[test]
    fn test_env_var_or_strips_comments() {
        // SAFETY: key is unique to this test
        unsafe { std::env::set_var("AIDEN_TEST_WINDOW", "12   # recent turns") };
        assert_eq!(env_var_or("AIDEN_TEST_WINDOW", 5usize), 12);

        unsafe { std::env::set_var("AIDEN_TEST_WINDOW", "not-a-number") };
        assert_eq!(env_var_or("AIDEN_TEST_WINDOW", 5usize), 5);

        unsafe { std::env::remove_var("AIDEN_TEST_WINDOW") };
        assert_eq!(env_var_or("AIDEN_TEST_WINDOW", 5usize), 5);
    }

    #[test]
    fn test_string_values_keep_hashes() {
        unsafe { std::env::set_var("AIDEN_TEST_PROMPT", "You are the #1 reviewer") };
        assert_eq!(text_var("AIDEN_TEST_PROMPT", "default"), "You are the #1 reviewer");

        unsafe { std::env::set_var("AIDEN_TEST_URL", "http://localhost:8080/v1#frag   # local proxy") };
        assert_eq!(word_var("AIDEN_TEST_URL", "x"), "http://localhost:8080/v1#frag");

        unsafe { std::env::set_var("AIDEN_TEST_URL", "   # only a comment") };
        assert_eq!(word_var("AIDEN_TEST_URL", "x"), "x");

        unsafe {
            std::env::remove_var("AIDEN_TEST_PROMPT");
            std::env::remove_var("AIDEN_TEST_URL");
        }
        assert_eq!(text_var("AIDEN_TEST_PROMPT", "default"), "default");
    }

    #[test]
    fn test_list_var() {
        unsafe { std::env::set_var("AIDEN_TEST_DENIED", "ctypes, pickle,,") };
        assert_eq!(list_var("AIDEN_TEST_DENIED"), vec!["ctypes", "pickle"]);
        unsafe { std::env::remove_var("AIDEN_TEST_DENIED") };
    }
}
