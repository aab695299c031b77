// src/llm/provider/analysis.rs
// Code-analysis prompt and strict decoding of the model's JSON report

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use super::{ChatMessage, GenerationOptions, ModelAdapter};
use crate::llm::error::ProviderError;

/// One entry in an analysis category: free text or a structured object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Finding {
    Text(String),
    Detailed(Map<String, Value>),
}

impl Finding {
    /// Human-readable one-liner for logs and CLI output
    pub fn summary(&self) -> String {
        match self {
            Finding::Text(text) => text.clone(),
            Finding::Detailed(map) => ["description", "issue", "summary", "suggestion"]
                .iter()
                .find_map(|key| map.get(*key).and_then(Value::as_str))
                .map(str::to_string)
                .unwrap_or_else(|| Value::Object(map.clone()).to_string()),
        }
    }
}

/// Structured report returned by `analyze_code`.
///
/// The four categories are required. Any other top-level keys the model
/// returned are kept in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CodeAnalysis {
    pub potential_issues: Vec<Finding>,
    pub security_concerns: Vec<Finding>,
    pub performance_notes: Vec<Finding>,
    pub improvement_suggestions: Vec<Finding>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl CodeAnalysis {
    /// Blocking findings, when the model reported a `critical_issues` key
    pub fn critical_issues(&self) -> Vec<Finding> {
        match self.extra.get("critical_issues") {
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| match item {
                    Value::String(s) => Finding::Text(s.clone()),
                    Value::Object(map) => Finding::Detailed(map.clone()),
                    other => Finding::Text(other.to_string()),
                })
                .collect(),
            Some(Value::String(s)) if !s.trim().is_empty() => vec![Finding::Text(s.clone())],
            _ => Vec::new(),
        }
    }

    pub fn is_clean(&self) -> bool {
        self.potential_issues.is_empty()
            && self.security_concerns.is_empty()
            && self.performance_notes.is_empty()
            && self.improvement_suggestions.is_empty()
    }
}

pub fn analysis_prompt(code: &str) -> String {
    format!(
        "Please analyze this code and provide a detailed report:\n\n\
         {code}\n\n\
         Respond with a single JSON object and nothing else, using these keys:\n\
         - potential_issues: list of potential bugs or issues\n\
         - security_concerns: list of security considerations\n\
         - performance_notes: list of performance-related observations\n\
         - improvement_suggestions: list of specific improvements\n\
         Add a critical_issues list only for problems that must block the change.\n\n\
         Be thorough but concise."
    )
}

pub fn analysis_messages(system: &str, code: &str) -> Vec<ChatMessage> {
    vec![ChatMessage::system(system), ChatMessage::user(analysis_prompt(code))]
}

/// Models often wrap JSON in a markdown fence; unwrap a single outer one.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let Some(body) = rest.strip_suffix("```") else {
        return trimmed;
    };
    match body.find('\n') {
        Some(idx) => body[idx + 1..].trim(),
        None => body.trim(),
    }
}

/// Decode a model reply as a `CodeAnalysis`. The text is only ever treated as data.
pub fn parse_analysis(provider: &str, text: &str) -> Result<CodeAnalysis, ProviderError> {
    serde_json::from_str::<CodeAnalysis>(strip_code_fence(text))
        .map_err(|e| ProviderError::parse_failed(provider, e))
}

/// Shared `analyze_code` body: prompt the adapter, then decode strictly
pub async fn run_analysis<A>(
    adapter: &A,
    system: &str,
    code: &str,
    options: &GenerationOptions,
) -> Result<CodeAnalysis, ProviderError>
where
    A: ModelAdapter + ?Sized,
{
    let messages = analysis_messages(system, code);
    let reply = adapter.generate_response(&messages, options).await?;
    parse_analysis(adapter.name(), &reply)
}

#[cfg(test)]
mod tests {
    use super::*;

    const REPORT: &str = r#"{
        "potential_issues": ["x is never read"],
        "security_concerns": [],
        "performance_notes": [{"description": "loop allocates", "line": 4}],
        "improvement_suggestions": ["rename x"]
    }"#;

    #[test]
    fn test_parse_plain_json() {
        let analysis = parse_analysis("openai", REPORT).unwrap();
        assert_eq!(analysis.potential_issues, vec![Finding::Text("x is never read".into())]);
        assert!(analysis.security_concerns.is_empty());
        assert_eq!(analysis.performance_notes[0].summary(), "loop allocates");
        assert!(analysis.extra.is_empty());
        assert!(analysis.critical_issues().is_empty());
    }

    #[test]
    fn test_parse_fenced_json() {
        let fenced = format!("```json\n{}\n```", REPORT);
        let analysis = parse_analysis("claude", &fenced).unwrap();
        assert_eq!(analysis.improvement_suggestions.len(), 1);
    }

    #[test]
    fn test_extra_keys_preserved() {
        let text = r#"{"potential_issues": [], "security_concerns": [],
            "performance_notes": [], "improvement_suggestions": [],
            "critical_issues": ["deletes user data"], "confidence": 0.4}"#;
        let analysis = parse_analysis("openai", text).unwrap();
        assert!(analysis.is_clean());
        assert_eq!(analysis.extra["confidence"], 0.4);
        assert_eq!(
            analysis.critical_issues(),
            vec![Finding::Text("deletes user data".into())]
        );
    }

    #[test]
    fn test_missing_category_rejected() {
        let text = r#"{"potential_issues": [], "security_concerns": [], "performance_notes": []}"#;
        let err = parse_analysis("openai", text).unwrap_err();
        assert!(matches!(err, ProviderError::ResponseParseFailed { ref provider, .. } if provider == "openai"));
        assert!(err.to_string().contains("improvement_suggestions"));
    }

    #[test]
    fn test_non_json_rejected() {
        // A Python dict literal is not JSON and must never be evaluated
        let text = "{'potential_issues': [], 'security_concerns': __import__('os').getcwd()}";
        assert!(matches!(
            parse_analysis("claude", text),
            Err(ProviderError::ResponseParseFailed { .. })
        ));

        assert!(parse_analysis("claude", "Sure! Here is my analysis.").is_err());
        assert!(parse_analysis("claude", "[1, 2, 3]").is_err());
        assert!(parse_analysis("claude", "```").is_err());
    }

    #[test]
    fn test_prompt_lists_categories() {
        let messages = analysis_messages("You are an expert code analyzer.", "x = 1");
        assert_eq!(messages.len(), 2);
        for key in [
            "potential_issues",
            "security_concerns",
            "performance_notes",
            "improvement_suggestions",
        ] {
            assert!(messages[1].content.contains(key));
        }
        assert!(messages[1].content.contains("x = 1"));
    }
}
