//! Decoding of server-sent-event lines into frames.

use super::validate::validate_chunk;

/// Marker that starts every data line.
pub const DATA_PREFIX: &str = "data: ";

/// A text fragment of a streamed answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delta {
    pub id: String,
    pub content: String,
}

/// One decoded line of a streamed response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamFrame {
    Delta(Delta),
    /// Comments, keep-alives, blank lines and data lines without content.
    NotData,
    /// A data line whose payload is not JSON, including the `[DONE]` sentinel.
    Malformed,
}

impl StreamFrame {
    /// Decode one line. Never fails: anything unusable maps to
    /// [`StreamFrame::NotData`] or [`StreamFrame::Malformed`].
    pub fn parse(line: &str) -> Self {
        let line = line.trim_end_matches(['\r', '\n']);
        let Some(payload) = line.strip_prefix(DATA_PREFIX) else {
            return StreamFrame::NotData;
        };
        if payload.trim().is_empty() {
            return StreamFrame::NotData;
        }

        match serde_json::from_str(payload) {
            Ok(value) => validate_chunk(value)
                .map(StreamFrame::Delta)
                .unwrap_or(StreamFrame::NotData),
            Err(_) => StreamFrame::Malformed,
        }
    }

    pub fn into_delta(self) -> Option<Delta> {
        match self {
            StreamFrame::Delta(delta) => Some(delta),
            StreamFrame::NotData | StreamFrame::Malformed => None,
        }
    }
}
