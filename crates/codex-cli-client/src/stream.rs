//! Push-to-pull bridge between runner callbacks and a chunk stream.

use tokio::sync::mpsc;
use tracing::warn;

use crate::error::ClientError;
use crate::types::CompletionChunk;

/// Queue items produced by the invocation task.
///
/// Terminal sentinels are never surfaced as ordinary chunks: `Error` is
/// re-raised once, and `Done` ends the sequence.
#[derive(Debug)]
pub(crate) enum StreamItem {
    Content(String),
    Error(ClientError),
    Done,
}

/// A finite, non-restartable sequence of completion chunks.
///
/// Content is pushed from the runner's synchronous delta callback into an
/// unbounded queue; the consumer parks on the channel when it is empty, so
/// there is no polling. The sequence does not end until the producing
/// invocation itself has completed, so a process-level failure after the
/// final content chunk is never lost.
pub struct CompletionStream {
    receiver: mpsc::UnboundedReceiver<StreamItem>,
    producer: Option<tokio::task::JoinHandle<()>>,
    finished: bool,
}

impl CompletionStream {
    pub(crate) fn new(
        receiver: mpsc::UnboundedReceiver<StreamItem>,
        producer: tokio::task::JoinHandle<()>,
    ) -> Self {
        Self {
            receiver,
            producer: Some(producer),
            finished: false,
        }
    }

    /// Next chunk, an error, or `None` when the invocation has finished.
    ///
    /// The channel closing without a terminal sentinel means the producer
    /// task died mid-invocation; that surfaces as an error rather than a
    /// clean end, so truncated output is never mistaken for completion.
    /// After the first `None` (or error), every subsequent call returns
    /// `None`.
    pub async fn next(&mut self) -> Option<Result<CompletionChunk, ClientError>> {
        if self.finished {
            return None;
        }

        loop {
            match self.receiver.recv().await {
                Some(StreamItem::Content(content)) if content.is_empty() => continue,
                Some(StreamItem::Content(content)) => {
                    return Some(Ok(CompletionChunk::content(content)));
                }
                Some(StreamItem::Error(err)) => {
                    self.finished = true;
                    self.await_producer().await;
                    return Some(Err(err));
                }
                Some(StreamItem::Done) => {
                    self.finished = true;
                    if let Some(detail) = self.await_producer().await {
                        return Some(Err(ClientError::Producer(detail)));
                    }
                    return None;
                }
                None => {
                    self.finished = true;
                    let detail = self
                        .await_producer()
                        .await
                        .unwrap_or_else(|| "producer ended without a completion sentinel".to_string());
                    return Some(Err(ClientError::Producer(detail)));
                }
            }
        }
    }

    /// Collect all remaining content into one string, surfacing the first
    /// error instead.
    pub async fn collect_text(&mut self) -> Result<String, ClientError> {
        let mut text = String::new();
        while let Some(chunk) = self.next().await {
            text.push_str(chunk?.delta());
        }
        Ok(text)
    }

    /// The sentinel only proves the run result was produced; awaiting the
    /// task itself makes sure the invocation fully unwound before the
    /// sequence reports completion. Returns the failure detail when the
    /// task panicked or was aborted.
    async fn await_producer(&mut self) -> Option<String> {
        let producer = self.producer.take()?;
        match producer.await {
            Ok(()) => None,
            Err(err) => {
                warn!(error = %err, "Completion producer task failed");
                Some(err.to_string())
            }
        }
    }
}

impl std::fmt::Debug for CompletionStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionStream")
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}
