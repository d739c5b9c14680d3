pub mod conversation;
pub mod error;
pub mod http;
pub mod traits;
pub mod types;

pub use conversation::Conversation;
pub use error::ChatError;
pub use http::{HttpClient, HttpClientConfig};
pub use traits::{LineStream, ResponseMode, Transport, TransportResponse};
pub use types::{
    Answer, AnswerKind, ChatRole, CompletionResult, FunctionCall, LanguageModelUsage, Message,
    MessageContent, Tool, ToolCall,
};
