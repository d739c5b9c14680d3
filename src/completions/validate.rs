//! Structural checks deciding whether a decoded payload is a usable answer.

use serde_json::Value;
use tracing::warn;

use super::response::ChatCompletionChunk;
use super::stream::Delta;
use crate::core::{Answer, ChatError, LanguageModelUsage, ToolCall};

/// A buffered response that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ValidCompletion {
    pub id: String,
    pub answer: Answer,
    pub usage: LanguageModelUsage,
}

/// Check a buffered body for an answer at choice 0, an `id` and `usage`.
///
/// Only presence is checked; a field holding an unexpected shape is decoded
/// as leniently as possible. Text content wins over tool calls when both are
/// present.
pub(crate) fn validate_completion(value: Value) -> Result<ValidCompletion, ChatError> {
    let message = value.pointer("/choices/0/message");
    let content = message.and_then(|m| present(m, "content"));
    let tool_calls = message.and_then(|m| present(m, "tool_calls"));
    let id = present(&value, "id");
    let usage = present(&value, "usage");

    let answer = match (content, tool_calls) {
        (Some(content), _) => Some(Answer::Text(content_text(content))),
        (None, Some(calls)) => Some(Answer::FunctionCall(decode_tool_calls(calls))),
        (None, None) => None,
    };

    match (id, answer, usage) {
        (Some(id), Some(answer), Some(usage)) => Ok(ValidCompletion {
            id: scalar_text(id),
            answer,
            usage: decode_usage(usage),
        }),
        (id, answer, usage) => {
            let mut missing = Vec::new();
            if answer.is_none() {
                missing.push("choices[0].message.content or tool_calls");
            }
            if id.is_none() {
                missing.push("id");
            }
            if usage.is_none() {
                missing.push("usage");
            }
            Err(ChatError::IncompleteResponse(missing.join(", ")))
        }
    }
}

fn present<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    value.get(key).filter(|v| !v.is_null())
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Plain strings pass through; content-part arrays are joined by their `text`.
fn content_text(content: &Value) -> String {
    match content {
        Value::Array(parts) => parts
            .iter()
            .filter_map(|part| match part {
                Value::String(s) => Some(s.as_str()),
                other => other.get("text").and_then(Value::as_str),
            })
            .collect(),
        other => scalar_text(other),
    }
}

fn decode_tool_calls(calls: &Value) -> Vec<ToolCall> {
    let Some(calls) = calls.as_array() else {
        warn!("tool_calls is not an array, ignoring it");
        return Vec::new();
    };
    calls
        .iter()
        .filter_map(|call| match serde_json::from_value(call.clone()) {
            Ok(call) => Some(call),
            Err(e) => {
                warn!(error = %e, "Skipping undecodable tool call");
                None
            }
        })
        .collect()
}

fn decode_usage(usage: &Value) -> LanguageModelUsage {
    let count = |key: &str| {
        usage
            .get(key)
            .and_then(Value::as_u64)
            .and_then(|n| u32::try_from(n).ok())
            .unwrap_or_default()
    };
    LanguageModelUsage {
        prompt_tokens: count("prompt_tokens"),
        completion_tokens: count("completion_tokens"),
        total_tokens: count("total_tokens"),
    }
}

/// Extract the text delta of a stream chunk.
///
/// `None` means the chunk is not a content frame (role-only preamble, finish
/// chunk, or an unrelated object) and should be skipped.
pub(crate) fn validate_chunk(value: Value) -> Option<Delta> {
    let chunk: ChatCompletionChunk = serde_json::from_value(value).ok()?;
    let content = chunk.choices.into_iter().next()?.delta?.content?;
    let id = chunk.id?;
    Some(Delta { id, content })
}
