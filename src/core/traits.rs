use async_trait::async_trait;
use futures::stream::BoxStream;

use super::error::ChatError;

/// Lines of a streamed body, ending when the connection closes.
pub type LineStream = BoxStream<'static, Result<String, ChatError>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseMode {
    Buffered,
    Streamed,
}

pub enum TransportResponse {
    Buffered(String),
    Lines(LineStream),
}

impl std::fmt::Debug for TransportResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportResponse::Buffered(body) => f.debug_tuple("Buffered").field(body).finish(),
            TransportResponse::Lines(_) => f.write_str("Lines(..)"),
        }
    }
}

/// The HTTP layer consumed by a session.
///
/// Implementations post a JSON body to `path` (relative to their base URL) and
/// return the body either whole or as a line stream. Failures, including
/// non-success statuses, surface as [`ChatError::Transport`]. No retries.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn post(
        &self,
        path: &str,
        body: &serde_json::Value,
        headers: &[(String, String)],
        mode: ResponseMode,
    ) -> Result<TransportResponse, ChatError>;
}
