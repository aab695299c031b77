// src/llm/provider/conversion.rs
// Translate the shared message format into each provider's native shape

use serde_json::{Value, json};

use super::{ChatMessage, Role};

/// Collapse role-tagged turns into a single text-completion prompt.
///
/// System turns lead the prompt as plain text, conversation turns become
/// `Human:`/`Assistant:` blocks, and the prompt always ends with an open
/// `Assistant:` turn for the model to complete.
pub fn to_completion_prompt(messages: &[ChatMessage]) -> String {
    let system: Vec<&str> = messages
        .iter()
        .filter(|m| m.role == Role::System)
        .map(|m| m.content.as_str())
        .collect();

    let mut prompt = system.join("\n\n");

    for msg in messages.iter().filter(|m| m.role != Role::System) {
        let label = match msg.role {
            Role::User => "Human",
            _ => "Assistant",
        };
        prompt.push_str(&format!("\n\n{}: {}", label, msg.content));
    }

    prompt.push_str("\n\nAssistant:");
    prompt
}

/// Convert messages to the OpenAI chat-completions format
pub fn to_openai_messages(messages: &[ChatMessage]) -> Vec<Value> {
    messages
        .iter()
        .map(|msg| {
            json!({
                "role": msg.role.as_str(),
                "content": msg.content
            })
        })
        .collect()
}
