//! Error types for the codex client.

use thiserror::Error;

use codex_process_runner::RunnerError;

/// Codex client error type.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The underlying codex invocation failed.
    #[error(transparent)]
    Runner(#[from] RunnerError),

    /// The streaming producer task died without reporting a result.
    #[error("Completion producer task failed: {0}")]
    Producer(String),
}

/// Result type for codex client operations.
pub type ClientResult<T> = Result<T, ClientError>;
