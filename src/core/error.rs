use thiserror::Error;

/// Errors surfaced by a chat turn or an embedding call.
///
/// Every variant is terminal for the call that produced it. Stream lines that
/// fail to decode are not errors; they are skipped while reading.
#[derive(Error, Debug)]
pub enum ChatError {
    /// The request never produced a usable response.
    ///
    /// `message` is the upstream body verbatim when the server answered with a
    /// non-success status, otherwise the low-level transport message.
    #[error("Transport error: {message}")]
    Transport {
        message: String,
        status_code: Option<u16>,
        body: Option<String>,
    },

    /// A buffered body that is not valid JSON.
    #[error("Response is not JSON: {message}")]
    MalformedResponse {
        message: String,
        #[source]
        source: serde_json::Error,
    },

    /// Valid JSON that lacks the fields required for a complete answer.
    #[error("Response is missing required fields: {0}")]
    IncompleteResponse(String),

    #[error("Failed to encode request: {message}")]
    Serialization {
        message: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl ChatError {
    pub(crate) fn transport(message: impl Into<String>) -> Self {
        ChatError::Transport {
            message: message.into(),
            status_code: None,
            body: None,
        }
    }

    /// The raw upstream body, when the server answered before failing.
    pub fn upstream_body(&self) -> Option<&str> {
        match self {
            ChatError::Transport { body, .. } => body.as_deref(),
            _ => None,
        }
    }
}
