//! Error types for the codex runner.

use thiserror::Error;

/// Codex runner error type.
#[derive(Debug, Error)]
pub enum RunnerError {
    /// The prompt was empty or whitespace.
    #[error("Codex CLI prompt is required")]
    EmptyPrompt,

    /// The codex binary could not be started.
    #[error("Failed to spawn codex process: {0}")]
    Spawn(#[from] std::io::Error),

    /// The spawned process exposed no stdout handle.
    #[error("Failed to get stdout from codex process")]
    NoStdout,

    /// The CLI emitted an explicit error event. Takes precedence over the
    /// exit code.
    #[error("{0}")]
    Protocol(String),

    /// Non-zero exit without any assistant text produced.
    #[error("{detail}")]
    AbnormalExit { exit_code: i32, detail: String },
}

/// Result type for codex runner operations.
pub type RunnerResult<T> = Result<T, RunnerError>;
