use serde::Serialize;
use serde_json::Value;

use crate::core::{ChatError, Message, MessageContent, Tool, ToolCall};

#[derive(Debug, Serialize)]
pub(crate) struct ChatCompletionRequest<'a> {
    pub model: &'a str,
    pub messages: Vec<RequestMessage<'a>>,
    pub stream: bool,
    pub temperature: f64,
    pub top_p: f64,
    /// Always 1; only the first choice is ever read.
    pub n: u8,
    pub user: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<RequestTool<'a>>>,
}

#[derive(Debug, Serialize)]
pub(crate) struct RequestMessage<'a> {
    pub role: &'static str,
    /// `null` for assistant turns that only carry tool calls.
    pub content: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<&'a [ToolCall]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<&'a str>,
}

#[derive(Debug, Serialize)]
pub(crate) struct RequestTool<'a> {
    #[serde(rename = "type")]
    pub r#type: &'static str,
    pub function: FunctionDeclaration<'a>,
}

#[derive(Debug, Serialize)]
pub(crate) struct FunctionDeclaration<'a> {
    pub name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<&'a str>,
    pub parameters: &'a Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strict: Option<bool>,
}

#[derive(Debug, Serialize)]
pub(crate) struct EmbeddingRequest<'a> {
    pub input: &'a str,
    pub model: &'a str,
}

/// Sampling and tagging settings for one turn.
#[derive(Debug, Clone, Copy)]
pub(crate) struct TurnSettings<'a> {
    pub model: &'a str,
    pub temperature: f64,
    pub top_p: f64,
    pub user: &'a str,
    pub stream: bool,
}

pub(crate) fn build_chat_request<'a>(
    messages: &'a [Message],
    tools: &'a [Tool],
    settings: TurnSettings<'a>,
) -> ChatCompletionRequest<'a> {
    let tools = if tools.is_empty() {
        None
    } else {
        Some(tools.iter().map(create_function_tool).collect())
    };

    ChatCompletionRequest {
        model: settings.model,
        messages: messages.iter().map(to_request_message).collect(),
        stream: settings.stream,
        temperature: settings.temperature,
        top_p: settings.top_p,
        n: 1,
        user: settings.user,
        tools,
    }
}

fn to_request_message(message: &Message) -> RequestMessage<'_> {
    let (content, tool_calls) = match &message.content {
        MessageContent::Text(text) => (Some(text.as_str()), None),
        MessageContent::ToolCalls(calls) => (None, Some(calls.as_slice())),
    };

    RequestMessage {
        role: message.role.as_str(),
        content,
        tool_calls,
        tool_call_id: message.tool_call_id.as_deref(),
    }
}

fn create_function_tool(tool: &Tool) -> RequestTool<'_> {
    RequestTool {
        r#type: "function",
        function: FunctionDeclaration {
            name: &tool.name,
            description: tool.description.as_deref(),
            parameters: &tool.parameters,
            strict: tool.strict,
        },
    }
}

pub(crate) fn to_json<T: Serialize>(request: &T) -> Result<Value, ChatError> {
    serde_json::to_value(request).map_err(|e| ChatError::Serialization {
        message: "Failed to serialize request".to_string(),
        source: e,
    })
}
