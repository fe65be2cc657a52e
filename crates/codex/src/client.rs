use std::{collections::BTreeMap, fmt, path::PathBuf, sync::Arc, time::Duration};

use agent_events::{
    apply_env, run_process, Agent, AgentResult, CancellationToken, EventHandler, LineLimits,
    ObservabilityProvider, RunError, RunMeta, RunOptions, RunRequest,
};
use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::{
    builder::CodexClientBuilder,
    defaults::{default_binary_path, default_rust_log_value, RUST_LOG_ENV},
    exec::CodexExecRequest,
    jsonl::{supports_option, CodexAdapter},
};

#[derive(Clone)]
pub struct CodexClient {
    pub(crate) binary: Option<PathBuf>,
    pub(crate) working_dir: Option<PathBuf>,
    pub(crate) env: BTreeMap<String, String>,
    pub(crate) timeout: Option<Duration>,
    pub(crate) default_model: Option<String>,
    pub(crate) default_event_handler: Option<Arc<dyn EventHandler>>,
    pub(crate) observability: Option<Arc<dyn ObservabilityProvider>>,
    pub(crate) line_limits: LineLimits,
}

impl fmt::Debug for CodexClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CodexClient")
            .field("binary", &self.resolve_binary())
            .field("working_dir", &self.working_dir)
            .field("timeout", &self.timeout)
            .field("default_model", &self.default_model)
            .finish_non_exhaustive()
    }
}

impl Default for CodexClient {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl CodexClient {
    pub fn builder() -> CodexClientBuilder {
        CodexClientBuilder::default()
    }

    /// Runs `codex exec --json` on `prompt`.
    ///
    /// Options the CLI cannot honor are rejected before anything is created
    /// or spawned. The final text comes from the `-o` last-message file when
    /// the CLI wrote one, otherwise from the streamed assistant text.
    pub async fn run(
        &self,
        cancel: &CancellationToken,
        prompt: &str,
        options: RunOptions,
    ) -> Result<AgentResult, RunError> {
        options.validate("codex", supports_option)?;

        let RunOptions {
            model,
            system_prompt,
            output_stream,
            event_handler,
            trace_id,
            ..
        } = options;
        let model = model.or_else(|| self.default_model.clone());

        let last_message = tempfile::Builder::new()
            .prefix("codex-last-message-")
            .suffix(".txt")
            .tempfile()
            .map_err(RunError::TempFile)?;

        let request = CodexExecRequest::new(prompt)
            .system_prompt(system_prompt)
            .model(model.clone())
            .last_message_file(last_message.path());

        let binary = self.resolve_binary();
        let mut cmd = Command::new(&binary);
        cmd.args(request.argv());

        if let Some(dir) = self.working_dir.as_ref() {
            cmd.current_dir(dir);
        }

        if let Some(value) = default_rust_log_value() {
            cmd.env(RUST_LOG_ENV, value);
        }
        apply_env(&mut cmd, &self.env);

        debug!(
            provider = "codex",
            binary = %binary.display(),
            model = model.as_deref().unwrap_or(""),
            last_message = %last_message.path().display(),
            "starting codex run"
        );

        let mut run = RunRequest::new(
            cmd,
            &binary,
            RunMeta {
                prompt: prompt.to_string(),
                model,
                trace_id,
            },
        );
        run.handler = event_handler.or_else(|| self.default_event_handler.clone());
        run.observer = self.observability.clone();
        run.output = output_stream;
        run.timeout = self.timeout;
        run.limits = self.line_limits;

        let mut adapter = CodexAdapter::with_last_message_file(last_message.path());
        let result = run_process(&mut adapter, run, cancel).await;
        drop(last_message);
        result
    }

    fn resolve_binary(&self) -> PathBuf {
        self.binary.clone().unwrap_or_else(default_binary_path)
    }
}

#[async_trait]
impl Agent for CodexClient {
    async fn run(
        &self,
        cancel: &CancellationToken,
        prompt: &str,
        options: RunOptions,
    ) -> Result<AgentResult, RunError> {
        CodexClient::run(self, cancel, prompt, options).await
    }
}
