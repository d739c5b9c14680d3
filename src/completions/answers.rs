use std::pin::Pin;
use std::task::{Context, Poll, ready};

use futures::{Stream, StreamExt};
use tracing::{debug, trace};

use super::stream::StreamFrame;
use crate::core::{Answer, ChatError, ChatRole, CompletionResult, Conversation, LineStream};

/// The answers of one turn, produced lazily.
///
/// A buffered turn yields exactly one result. A streamed turn yields one
/// result per content fragment, reading a line only when polled; once the
/// line stream ends the concatenated text is appended to the history as a
/// single assistant message. Dropping the stream early leaves the history
/// without an assistant reply.
///
/// The stream borrows the session, so no other turn can start until it is
/// dropped. It cannot be restarted.
pub struct AnswerStream<'a> {
    source: Source<'a>,
}

enum Source<'a> {
    Ready(Option<CompletionResult>),
    Lines(LineTurn<'a>),
}

struct LineTurn<'a> {
    lines: LineStream,
    conversation: &'a mut Conversation,
    model: String,
    answer: String,
    finished: bool,
}

impl<'a> AnswerStream<'a> {
    pub(crate) fn ready(result: CompletionResult) -> Self {
        Self {
            source: Source::Ready(Some(result)),
        }
    }

    pub(crate) fn streaming(
        lines: LineStream,
        conversation: &'a mut Conversation,
        model: String,
    ) -> Self {
        Self {
            source: Source::Lines(LineTurn {
                lines,
                conversation,
                model,
                answer: String::new(),
                finished: false,
            }),
        }
    }

    /// Drain the stream and return the concatenated text.
    pub async fn text(mut self) -> Result<String, ChatError> {
        let mut text = String::new();
        while let Some(result) = self.next().await {
            if let Answer::Text(fragment) = result?.answer {
                text.push_str(&fragment);
            }
        }
        Ok(text)
    }
}

impl LineTurn<'_> {
    fn poll_fragment(
        &mut self,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<CompletionResult, ChatError>>> {
        if self.finished {
            return Poll::Ready(None);
        }

        loop {
            match ready!(self.lines.poll_next_unpin(cx)) {
                Some(Ok(line)) => match StreamFrame::parse(&line) {
                    StreamFrame::Delta(delta) => {
                        self.answer.push_str(&delta.content);
                        return Poll::Ready(Some(Ok(CompletionResult {
                            answer: Answer::Text(delta.content),
                            id: delta.id,
                            model: self.model.clone(),
                            usage: None,
                        })));
                    }
                    frame => trace!(?frame, line = %line, "Skipping stream line"),
                },
                Some(Err(e)) => {
                    self.finished = true;
                    return Poll::Ready(Some(Err(e)));
                }
                None => {
                    self.finished = true;
                    let answer = std::mem::take(&mut self.answer);
                    debug!(chars = answer.len(), "Streamed answer complete");
                    self.conversation.append(answer, ChatRole::Assistant);
                    return Poll::Ready(None);
                }
            }
        }
    }
}

impl Stream for AnswerStream<'_> {
    type Item = Result<CompletionResult, ChatError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        match &mut self.get_mut().source {
            Source::Ready(result) => Poll::Ready(result.take().map(Ok)),
            Source::Lines(turn) => turn.poll_fragment(cx),
        }
    }
}

impl std::fmt::Debug for AnswerStream<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.source {
            Source::Ready(result) => f.debug_tuple("AnswerStream::Ready").field(result).finish(),
            Source::Lines(turn) => f
                .debug_struct("AnswerStream::Lines")
                .field("model", &turn.model)
                .field("received", &turn.answer.len())
                .field("finished", &turn.finished)
                .finish(),
        }
    }
}
