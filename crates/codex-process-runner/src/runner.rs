//! Spawning and event-loop plumbing for `codex exec`.

use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader, Lines};
use tokio::process::{ChildStderr, Command};
use tracing::{debug, warn};

use crate::config::RunnerConfig;
use crate::error::{RunnerError, RunnerResult};
use crate::event::{ansi_regex, parse_event_line, CodexEvent, TokenUsage};

/// Final result of one codex invocation.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// Last cumulative assistant text. Empty when the CLI produced none.
    pub text: String,
    /// Usage statistics from the final completed turn, when reported.
    pub usage: Option<TokenUsage>,
    /// The child's exit code.
    pub exit_code: i32,
    /// Captured stderr, trimmed; `None` when empty.
    pub stderr: Option<String>,
    /// The thread handle reported by the CLI, falling back to the resume
    /// input when the subprocess never reported a new one.
    pub thread_id: Option<String>,
}

/// Per-invocation callbacks, invoked synchronously as events arrive.
#[derive(Default)]
pub struct RunHooks {
    on_delta: Option<Box<dyn FnMut(&str) + Send>>,
    on_event: Option<Box<dyn FnMut(&CodexEvent) + Send>>,
}

impl RunHooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Receive each newly produced text suffix (never the full cumulative
    /// text twice).
    pub fn on_delta(mut self, callback: impl FnMut(&str) + Send + 'static) -> Self {
        self.on_delta = Some(Box::new(callback));
        self
    }

    /// Receive every parsed protocol event, in emission order.
    pub fn on_event(mut self, callback: impl FnMut(&CodexEvent) + Send + 'static) -> Self {
        self.on_event = Some(Box::new(callback));
        self
    }
}

impl std::fmt::Debug for RunHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunHooks")
            .field("on_delta", &self.on_delta.is_some())
            .field("on_event", &self.on_event.is_some())
            .finish()
    }
}

async fn next_stderr(lines: &mut Option<Lines<BufReader<ChildStderr>>>) -> Option<String> {
    match lines {
        Some(lines) => lines.next_line().await.ok().flatten(),
        None => None,
    }
}

/// Run one `codex exec` invocation to completion.
///
/// Reads stdout as newline-delimited JSON events and stderr as free-form
/// diagnostics, concurrently. `agent_message` events carry cumulative text;
/// only the new suffix relative to the last-seen text reaches `on_delta`.
///
/// Failure precedence on exit: an explicit error event always wins, then a
/// non-zero exit with no assistant text; otherwise the invocation succeeds
/// even on a non-zero exit.
pub async fn run(config: &RunnerConfig, mut hooks: RunHooks) -> RunnerResult<RunOutcome> {
    if config.prompt.trim().is_empty() {
        return Err(RunnerError::EmptyPrompt);
    }

    let args = config.build_args();
    debug!(
        bin = %config.bin,
        working_dir = %config.working_dir,
        has_resume = config.resume_thread_id.is_some(),
        "Spawning codex exec"
    );

    let mut command = Command::new(&config.bin);
    command
        .args(&args)
        .current_dir(&config.working_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    for (name, value) in &config.env {
        command.env(name, value);
    }

    let mut child = command.spawn()?;
    let stdout = child.stdout.take().ok_or(RunnerError::NoStdout)?;
    let mut stdout_lines = BufReader::new(stdout).lines();
    let mut stderr_lines = child.stderr.take().map(|s| BufReader::new(s).lines());
    let mut stderr_open = stderr_lines.is_some();

    let ansi = ansi_regex();
    let mut last_text = String::new();
    let mut usage: Option<TokenUsage> = None;
    let mut error_message: Option<String> = None;
    let mut thread_id = config.resume_thread_id.clone();
    let mut stderr_buf = String::new();

    loop {
        tokio::select! {
            line = stdout_lines.next_line() => match line {
                Ok(Some(line)) => {
                    let Some(event) = parse_event_line(&line, &ansi) else {
                        continue;
                    };

                    match &event {
                        CodexEvent::ThreadStarted { thread_id: id } => {
                            thread_id = Some(id.clone());
                        }
                        CodexEvent::TurnCompleted { usage: turn_usage } => {
                            usage = Some(turn_usage.clone());
                        }
                        CodexEvent::Error { message } => {
                            error_message = Some(message.clone());
                        }
                        CodexEvent::AgentMessage { .. } => {}
                    }

                    if let Some(on_event) = hooks.on_event.as_mut() {
                        on_event(&event);
                    }

                    if let CodexEvent::AgentMessage { text } = event {
                        let delta = if !last_text.is_empty() && text.starts_with(&last_text) {
                            text[last_text.len()..].to_string()
                        } else {
                            text.clone()
                        };
                        last_text = text;
                        if !delta.is_empty() {
                            if let Some(on_delta) = hooks.on_delta.as_mut() {
                                on_delta(&delta);
                            }
                        }
                    }
                }
                Ok(None) => break,
                Err(err) => {
                    warn!(error = %err, "Error reading codex stdout");
                    break;
                }
            },
            line = next_stderr(&mut stderr_lines), if stderr_open => match line {
                Some(line) => {
                    stderr_buf.push_str(&line);
                    stderr_buf.push('\n');
                }
                None => stderr_open = false,
            },
        }
    }

    // Stdout is done; drain whatever stderr remains for diagnostics.
    if let Some(lines) = stderr_lines.as_mut() {
        while let Ok(Some(line)) = lines.next_line().await {
            stderr_buf.push_str(&line);
            stderr_buf.push('\n');
        }
    }

    let status = child.wait().await?;

    let stderr_text = {
        let trimmed = stderr_buf.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    };

    if let Some(message) = error_message {
        debug!("Codex invocation failed via protocol error event");
        return Err(RunnerError::Protocol(message));
    }

    let exit_code = status.code().unwrap_or(1);
    if exit_code != 0 && last_text.is_empty() {
        let detail = stderr_text
            .unwrap_or_else(|| format!("codex exec exited with code {exit_code}"));
        return Err(RunnerError::AbnormalExit { exit_code, detail });
    }

    Ok(RunOutcome {
        text: last_text,
        usage,
        exit_code,
        stderr: stderr_text,
        thread_id,
    })
}
