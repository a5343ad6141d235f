//! The codex-backed chat-completion client.

use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

use codex_process_runner::{run, RunHooks, RunnerConfig, DEFAULT_CODEX_BIN};
use codex_session_cache::{SessionContinuityCache, SessionKey};
use codex_thread_store::{Scope, DEFAULT_PROVIDER};

use crate::error::ClientResult;
use crate::prompt::{render_resume, render_transcript};
use crate::stream::{CompletionStream, StreamItem};
use crate::types::{Completion, CompletionRequest, CompletionResponse};

/// Environment variable names handed to the codex child process. Their
/// exact names are a contract with the CLI tool and its hooks, not logic
/// of this crate.
const ENV_USER_ID: &str = "TASKTITAN_USER_ID";
const ENV_CONVERSATION_ID: &str = "TASKTITAN_CONVERSATION_ID";
const ENV_AUTH_TOKEN: &str = "TASKTITAN_AUTH_TOKEN";
const ENV_PROVIDER: &str = "TASKTITAN_PROVIDER";
const ENV_WORKDIR: &str = "TASKTITAN_WORKDIR";

/// How many trailing history messages are re-sent when resuming a thread.
/// A heuristic bound, not a contract.
const DEFAULT_RESUME_HISTORY_WINDOW: usize = 6;

/// Client construction parameters.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Model used when the request carries none.
    pub default_model: String,
    /// Working directory for codex invocations.
    pub cwd: String,
    /// Path or name of the codex binary.
    pub bin: String,
    /// Whether invocations run with `--full-auto`.
    pub full_auto: bool,
    /// Provider identifier for session keys and correlation.
    pub provider: String,
    /// Owner of the conversation.
    pub user_id: String,
    /// Distinct conversation id; when absent, continuity is tracked per
    /// user instead of per conversation.
    pub conversation_id: Option<String>,
    /// Opaque auth token forwarded to the child environment.
    pub auth_token: Option<String>,
    /// Trailing history window used when resuming a thread.
    pub resume_history_window: usize,
}

impl ClientConfig {
    /// Create a configuration with defaults.
    pub fn new(user_id: impl Into<String>, cwd: impl Into<String>) -> Self {
        Self {
            default_model: "gpt-5-codex".to_string(),
            cwd: cwd.into(),
            bin: DEFAULT_CODEX_BIN.to_string(),
            full_auto: true,
            provider: DEFAULT_PROVIDER.to_string(),
            user_id: user_id.into(),
            conversation_id: None,
            auth_token: None,
            resume_history_window: DEFAULT_RESUME_HISTORY_WINDOW,
        }
    }

    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    pub fn with_bin(mut self, bin: impl Into<String>) -> Self {
        self.bin = bin.into();
        self
    }

    pub fn with_full_auto(mut self, full_auto: bool) -> Self {
        self.full_auto = full_auto;
        self
    }

    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = provider.into();
        self
    }

    pub fn with_conversation(mut self, conversation_id: impl Into<String>) -> Self {
        self.conversation_id = Some(conversation_id.into());
        self
    }

    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    pub fn with_resume_history_window(mut self, window: usize) -> Self {
        self.resume_history_window = window;
        self
    }
}

/// A chat-completion client backed by local `codex exec` invocations.
///
/// The continuity cache is injected, not global: multiple clients may share
/// one cache, and tests may wire isolated ones.
pub struct CodexCliClient {
    config: ClientConfig,
    cache: Arc<SessionContinuityCache>,
    session_key: String,
}

impl CodexCliClient {
    pub fn new(config: ClientConfig, cache: Arc<SessionContinuityCache>) -> Self {
        let scope = if config.conversation_id.is_some() {
            Scope::Conversation
        } else {
            Scope::User
        };
        let session_key = SessionKey::new(
            &config.provider,
            &config.user_id,
            scope,
            config.conversation_id.as_deref().unwrap_or(""),
        )
        .canonical();

        Self {
            config,
            cache,
            session_key,
        }
    }

    /// The canonical session key this client reads and writes.
    pub fn session_key(&self) -> &str {
        &self.session_key
    }

    /// Create a completion.
    ///
    /// Honors `request.stream`: returns either a full completion or a chunk
    /// stream. Invocation failures reject the call (or are re-raised from
    /// the stream); continuity failures never do.
    pub async fn create(&self, request: CompletionRequest) -> ClientResult<CompletionResponse> {
        if request.stream {
            Ok(CompletionResponse::Stream(self.create_stream(&request).await))
        } else {
            let completion = self.create_completion(&request).await?;
            Ok(CompletionResponse::Full(Box::new(completion)))
        }
    }

    async fn create_completion(&self, request: &CompletionRequest) -> ClientResult<Completion> {
        let (runner_config, model) = self.prepare(request).await;
        let outcome = run(&runner_config, RunHooks::new()).await?;

        if let Some(thread_id) = &outcome.thread_id {
            self.cache.set(&self.session_key, thread_id);
        }

        Ok(Completion::assistant(model, outcome.text, outcome.usage))
    }

    async fn create_stream(&self, request: &CompletionRequest) -> CompletionStream {
        let (runner_config, _model) = self.prepare(request).await;

        let (sender, receiver) = mpsc::unbounded_channel();
        let delta_sender = sender.clone();
        let cache = self.cache.clone();
        let session_key = self.session_key.clone();

        let producer = tokio::spawn(async move {
            let hooks = RunHooks::new().on_delta(move |delta| {
                let _ = delta_sender.send(StreamItem::Content(delta.to_string()));
            });

            match run(&runner_config, hooks).await {
                Ok(outcome) => {
                    // Write back before the terminal sentinel so a caller
                    // that drains the stream and immediately re-requests
                    // observes continuity.
                    if let Some(thread_id) = &outcome.thread_id {
                        cache.set(&session_key, thread_id);
                    }
                    let _ = sender.send(StreamItem::Done);
                }
                Err(err) => {
                    let _ = sender.send(StreamItem::Error(err.into()));
                    let _ = sender.send(StreamItem::Done);
                }
            }
        });

        CompletionStream::new(receiver, producer)
    }

    /// Resolve continuity state and render the outbound invocation.
    async fn prepare(&self, request: &CompletionRequest) -> (RunnerConfig, String) {
        let model = request
            .model
            .clone()
            .unwrap_or_else(|| self.config.default_model.clone());

        let resume_thread_id = self.cache.get(&self.session_key).await;
        let prompt = match resume_thread_id {
            Some(_) => render_resume(&request.messages, self.config.resume_history_window),
            None => render_transcript(&request.messages),
        };
        debug!(
            session_key = %self.session_key,
            resuming = resume_thread_id.is_some(),
            "Prepared codex invocation"
        );

        let mut runner_config = RunnerConfig::new(prompt, self.config.cwd.clone())
            .with_bin(self.config.bin.clone())
            .with_model(model.clone())
            .with_full_auto(self.config.full_auto)
            .with_env(ENV_USER_ID, self.config.user_id.clone())
            .with_env(ENV_PROVIDER, self.config.provider.clone())
            .with_env(ENV_WORKDIR, self.config.cwd.clone());

        if let Some(conversation_id) = &self.config.conversation_id {
            runner_config = runner_config.with_env(ENV_CONVERSATION_ID, conversation_id.clone());
        }
        if let Some(token) = &self.config.auth_token {
            runner_config = runner_config.with_env(ENV_AUTH_TOKEN, token.clone());
        }
        if let Some(thread_id) = resume_thread_id {
            runner_config = runner_config.with_resume_thread(thread_id);
        }

        (runner_config, model)
    }
}

impl std::fmt::Debug for CodexCliClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodexCliClient")
            .field("session_key", &self.session_key)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
