//! Codex CLI subprocess runner.
//!
//! Invokes `codex exec --json` and turns its line-delimited JSON event
//! stream into per-invocation callbacks plus a final [`RunOutcome`]. The
//! runner tolerates protocol noise (unparsable lines are dropped), but an
//! explicit error event from the CLI always fails the invocation, whatever
//! the eventual exit code says.
//!
//! No retries and no cancellation live at this layer; both belong to the
//! caller.

mod config;
mod error;
mod event;
mod runner;

pub use config::{RunnerConfig, DEFAULT_CODEX_BIN};
pub use error::{RunnerError, RunnerResult};
pub use event::{CodexEvent, TokenUsage};
pub use runner::{run, RunHooks, RunOutcome};
