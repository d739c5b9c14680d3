pub(crate) mod constants;
mod openai;

pub use openai::{ApiKey, OpenAiConfig};
