//! # gpt-chat
//!
//! A small client for OpenAI-style chat completions that keeps the
//! conversation for you. Answers come back either buffered or as a lazy
//! stream of fragments decoded from server-sent events.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use futures::StreamExt;
//! use gpt_chat::{ApiKey, AskOptions, ChatRole, ChatSession, OpenAiConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = OpenAiConfig::from_api_key(ApiKey::Default)?;
//!     let mut chat = ChatSession::new(config)?;
//!     chat.add_message("You are a virtual assistant expert in Rust", ChatRole::System);
//!
//!     let mut answers = chat
//!         .ask("Give me 3 useful functions for slices", AskOptions::streaming())
//!         .await?;
//!     while let Some(fragment) = answers.next().await {
//!         print!("{}", fragment?.answer.as_text().unwrap_or_default());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! Only one turn can be in flight per session: the stream returned by
//! [`ChatSession::ask`] borrows the session until it is dropped.

pub mod completions;
pub mod core;
pub mod provider;

pub use crate::completions::{AnswerStream, AskOptions, ChatSession, Delta, StreamFrame};
pub use crate::core::{
    Answer, AnswerKind, ChatError, ChatRole, CompletionResult, Conversation, FunctionCall,
    HttpClient, HttpClientConfig, LanguageModelUsage, LineStream, Message, MessageContent,
    ResponseMode, Tool, ToolCall, Transport, TransportResponse,
};
pub use crate::provider::{ApiKey, OpenAiConfig};
