//! Configuration for codex CLI invocations.

/// Binary invoked when no override is configured. Discovery heuristics
/// (nvm paths, PATH search) belong to the composition root.
pub const DEFAULT_CODEX_BIN: &str = "codex";

/// Configuration for a single `codex exec` invocation.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Path or name of the codex binary.
    pub bin: String,

    /// The rendered prompt, passed as the final positional argument.
    pub prompt: String,

    /// Optional model flag value.
    pub model: Option<String>,

    /// Working directory for the child process.
    pub working_dir: String,

    /// Thread to resume instead of starting a new one.
    pub resume_thread_id: Option<String>,

    /// Whether to pass `--full-auto`.
    pub full_auto: bool,

    /// Opaque correlation values injected into the child environment.
    /// The variable names are a contract with the codex CLI, owned by the
    /// caller, not by this crate.
    pub env: Vec<(String, String)>,
}

impl RunnerConfig {
    /// Create a configuration with defaults.
    pub fn new(prompt: impl Into<String>, working_dir: impl Into<String>) -> Self {
        Self {
            bin: DEFAULT_CODEX_BIN.to_string(),
            prompt: prompt.into(),
            model: None,
            working_dir: working_dir.into(),
            resume_thread_id: None,
            full_auto: true,
            env: Vec::new(),
        }
    }

    /// Override the codex binary.
    pub fn with_bin(mut self, bin: impl Into<String>) -> Self {
        self.bin = bin.into();
        self
    }

    /// Set the model flag.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Resume an existing thread.
    pub fn with_resume_thread(mut self, thread_id: impl Into<String>) -> Self {
        self.resume_thread_id = Some(thread_id.into());
        self
    }

    /// Enable or disable `--full-auto`.
    pub fn with_full_auto(mut self, full_auto: bool) -> Self {
        self.full_auto = full_auto;
        self
    }

    /// Add an environment variable for the child process.
    pub fn with_env(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((name.into(), value.into()));
        self
    }

    /// Build the codex argument vector.
    ///
    /// Argument order is a hard contract of the CLI: base flags, automation
    /// flag, resume sub-command, model flag, then the prompt as the final
    /// positional argument.
    pub fn build_args(&self) -> Vec<String> {
        let mut args = vec!["exec".to_string(), "--json".to_string()];

        if self.full_auto {
            args.push("--full-auto".to_string());
        }
        if let Some(ref thread_id) = self.resume_thread_id {
            args.push("resume".to_string());
            args.push(thread_id.clone());
        }
        if let Some(ref model) = self.model {
            args.push("-m".to_string());
            args.push(model.clone());
        }
        args.push(self.prompt.clone());

        args
    }
}
