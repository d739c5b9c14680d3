use std::time::Duration;

pub const API_BASE: &str = "https://api.openai.com";
pub const CHAT_COMPLETIONS_ENDPOINT: &str = "/v1/chat/completions";
pub const EMBEDDINGS_ENDPOINT: &str = "/v1/embeddings";
pub const API_KEY_ENV_VAR: &str = "OPENAI_API_KEY";

pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-ada-002";
/// Sent as `user` when the caller does not tag a turn.
pub const DEFAULT_USER: &str = "gpt-chat";
pub const DEFAULT_TEMPERATURE: f64 = 1.0;
pub const DEFAULT_TOP_P: f64 = 1.0;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(360);
