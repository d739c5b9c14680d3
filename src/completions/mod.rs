//! Chat-completion turns: payloads, validation, stream decoding and the session.

mod answers;
pub mod client;
pub(crate) mod request;
pub(crate) mod response;
pub mod stream;
pub(crate) mod validate;

pub use answers::AnswerStream;
pub use client::{AskOptions, ChatSession};
pub use stream::{DATA_PREFIX, Delta, StreamFrame};
