//! Loosely typed view of a streamed completion chunk.
//!
//! Every field is optional so presence can be checked after decoding;
//! preamble and finish chunks carry no content.

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub(crate) struct ChatCompletionChunk {
    pub id: Option<String>,
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChunkChoice {
    pub delta: Option<ChunkDelta>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChunkDelta {
    pub content: Option<String>,
}
