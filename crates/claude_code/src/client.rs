use std::{collections::BTreeMap, fmt, path::PathBuf, sync::Arc, time::Duration};

use agent_events::{
    apply_env, run_process, Adapter, Agent, AgentResult, CancellationToken, EventHandler,
    LineLimits, ObservabilityProvider, RunError, RunMeta, RunOptions, RunRequest,
};
use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::{adapter::ClaudeAdapter, builder::ClaudeClientBuilder, request::ClaudePrintRequest};

#[derive(Clone)]
pub struct ClaudeClient {
    pub(crate) binary: Option<PathBuf>,
    pub(crate) working_dir: Option<PathBuf>,
    pub(crate) env: BTreeMap<String, String>,
    pub(crate) timeout: Option<Duration>,
    pub(crate) default_model: Option<String>,
    pub(crate) default_event_handler: Option<Arc<dyn EventHandler>>,
    pub(crate) observability: Option<Arc<dyn ObservabilityProvider>>,
    pub(crate) line_limits: LineLimits,
}

impl fmt::Debug for ClaudeClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClaudeClient")
            .field("binary", &self.resolve_binary())
            .field("working_dir", &self.working_dir)
            .field("timeout", &self.timeout)
            .field("default_model", &self.default_model)
            .finish_non_exhaustive()
    }
}

impl Default for ClaudeClient {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl ClaudeClient {
    pub fn builder() -> ClaudeClientBuilder {
        ClaudeClientBuilder::default()
    }

    /// Runs `claude -p` on `prompt`, streaming normalized events to the
    /// run's (or the client's) event handler.
    ///
    /// Per-run options win over client defaults. The completion record is
    /// sent to the client's observability provider, if any.
    pub async fn run(
        &self,
        cancel: &CancellationToken,
        prompt: &str,
        options: RunOptions,
    ) -> Result<AgentResult, RunError> {
        let mut adapter = ClaudeAdapter::new();
        options.validate(adapter.provider(), |option| adapter.supports(option))?;

        let RunOptions {
            model,
            max_turns,
            max_output_tokens,
            allowed_tools,
            disallowed_tools,
            system_prompt,
            output_stream,
            event_handler,
            trace_id,
        } = options;
        let model = model.or_else(|| self.default_model.clone());

        let request = ClaudePrintRequest::new(prompt)
            .model(model.clone())
            .max_turns(max_turns)
            .max_output_tokens(max_output_tokens)
            .allowed_tools(allowed_tools)
            .disallowed_tools(disallowed_tools)
            .system_prompt(system_prompt);

        let binary = self.resolve_binary();
        let mut cmd = Command::new(&binary);
        cmd.args(request.argv());

        if let Some(dir) = self.working_dir.as_ref() {
            cmd.current_dir(dir);
        }

        apply_env(&mut cmd, &self.env);
        for (key, value) in request.env() {
            cmd.env(key, value);
        }

        debug!(
            provider = "claude",
            binary = %binary.display(),
            model = model.as_deref().unwrap_or(""),
            "starting claude run"
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

        run_process(&mut adapter, run, cancel).await
    }

    fn resolve_binary(&self) -> PathBuf {
        if let Some(b) = self.binary.as_ref() {
            return b.clone();
        }
        if let Ok(v) = std::env::var("CLAUDE_BINARY") {
            if !v.trim().is_empty() {
                return PathBuf::from(v);
            }
        }
        PathBuf::from("claude")
    }
}

#[async_trait]
impl Agent for ClaudeClient {
    async fn run(
        &self,
        cancel: &CancellationToken,
        prompt: &str,
        options: RunOptions,
    ) -> Result<AgentResult, RunError> {
        ClaudeClient::run(self, cancel, prompt, options).await
    }
}
