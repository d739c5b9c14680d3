use schemars::{JsonSchema, schema_for};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;

use super::error::ChatError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    System,
    User,
    Assistant,
    Tool,
}

impl ChatRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatRole::System => "system",
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
            ChatRole::Tool => "tool",
        }
    }
}

impl std::fmt::Display for ChatRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MessageContent {
    Text(String),
    ToolCalls(Vec<ToolCall>),
}

impl MessageContent {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            MessageContent::Text(text) => Some(text),
            MessageContent::ToolCalls(_) => None,
        }
    }
}

impl From<String> for MessageContent {
    fn from(text: String) -> Self {
        MessageContent::Text(text)
    }
}

impl From<&str> for MessageContent {
    fn from(text: &str) -> Self {
        MessageContent::Text(text.to_string())
    }
}

impl From<Vec<ToolCall>> for MessageContent {
    fn from(calls: Vec<ToolCall>) -> Self {
        MessageContent::ToolCalls(calls)
    }
}

/// One entry of the conversation history.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub role: ChatRole,
    pub content: MessageContent,
    /// Set on `tool` replies to reference the call they answer.
    pub tool_call_id: Option<String>,
}

impl Message {
    pub fn new(role: ChatRole, content: impl Into<MessageContent>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_call_id: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(ChatRole::User, MessageContent::Text(content.into()))
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(ChatRole::Assistant, MessageContent::Text(content.into()))
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(ChatRole::System, MessageContent::Text(content.into()))
    }

    /// A `tool` reply carrying the output of the call identified by `call_id`.
    pub fn tool_result(call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Tool,
            content: MessageContent::Text(content.into()),
            tool_call_id: Some(call_id.into()),
        }
    }
}

/// A function call requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type", default = "function_type")]
    pub kind: String,
    pub function: FunctionCall,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    /// Usually a JSON-encoded string; some servers send an object instead.
    #[serde(default)]
    pub arguments: Value,
}

fn function_type() -> String {
    "function".to_string()
}

impl ToolCall {
    /// Decode the call arguments into `T`, accepting both encoded and inline JSON.
    pub fn arguments<T: DeserializeOwned>(&self) -> Result<T, ChatError> {
        let parsed = match &self.function.arguments {
            Value::String(s) => serde_json::from_str(s),
            other => serde_json::from_value(other.clone()),
        };
        parsed.map_err(|e| ChatError::MalformedResponse {
            message: format!("Failed to parse arguments for `{}`", self.function.name),
            source: e,
        })
    }
}

/// A function declaration offered to the model.
#[derive(Debug, Clone, PartialEq)]
pub struct Tool {
    pub name: String,
    pub description: Option<String>,
    pub parameters: Value,
    pub strict: Option<bool>,
}

impl Tool {
    pub fn new(name: impl Into<String>, parameters: Value) -> Self {
        Self {
            name: name.into(),
            description: None,
            parameters,
            strict: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = Some(strict);
        self
    }

    /// Build a declaration whose parameters are the JSON schema of `T`.
    ///
    /// `T` must describe an object, since function arguments are always named.
    pub fn from_schema<T: JsonSchema>(name: impl Into<String>) -> Result<Self, ChatError> {
        let schema = schema_for!(T);
        let mut parameters =
            serde_json::to_value(&schema).map_err(|e| ChatError::Serialization {
                message: "Failed to build JSON Schema".to_string(),
                source: e,
            })?;

        let is_object = parameters
            .get("type")
            .and_then(|t| t.as_str())
            .map(|t| t == "object")
            .unwrap_or(false);
        if !is_object {
            return Err(ChatError::Configuration(
                "Tool parameters must be an object schema".to_string(),
            ));
        }

        let description = parameters
            .get("description")
            .and_then(|d| d.as_str())
            .map(str::to_owned);

        if let Some(obj) = parameters.as_object_mut() {
            obj.remove("$schema");
            obj.remove("title");
            obj.remove("description");
        }

        Ok(Self {
            name: name.into(),
            description,
            parameters,
            strict: None,
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageModelUsage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Answer {
    Text(String),
    FunctionCall(Vec<ToolCall>),
}

impl Answer {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Answer::Text(text) => Some(text),
            Answer::FunctionCall(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerKind {
    Text,
    Function,
}

/// The value yielded to the caller for one answer or one streamed fragment.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionResult {
    pub answer: Answer,
    pub id: String,
    pub model: String,
    /// Only buffered answers carry usage; streamed fragments never do.
    pub usage: Option<LanguageModelUsage>,
}

impl CompletionResult {
    pub fn kind(&self) -> AnswerKind {
        match self.answer {
            Answer::Text(_) => AnswerKind::Text,
            Answer::FunctionCall(_) => AnswerKind::Function,
        }
    }
}
