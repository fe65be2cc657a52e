use std::{collections::BTreeMap, fmt, path::PathBuf, sync::Arc, time::Duration};

use agent_events::{EventHandler, LineLimits, ObservabilityProvider};

use crate::client::ClaudeClient;

#[derive(Clone, Default)]
pub struct ClaudeClientBuilder {
    pub(crate) binary: Option<PathBuf>,
    pub(crate) working_dir: Option<PathBuf>,
    pub(crate) env: BTreeMap<String, String>,
    pub(crate) timeout: Option<Duration>,
    pub(crate) default_model: Option<String>,
    pub(crate) default_event_handler: Option<Arc<dyn EventHandler>>,
    pub(crate) observability: Option<Arc<dyn ObservabilityProvider>>,
    pub(crate) line_limits: LineLimits,
}

impl fmt::Debug for ClaudeClientBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClaudeClientBuilder")
            .field("binary", &self.binary)
            .field("working_dir", &self.working_dir)
            .field("env", &self.env)
            .field("timeout", &self.timeout)
            .field("default_model", &self.default_model)
            .field("line_limits", &self.line_limits)
            .finish_non_exhaustive()
    }
}

impl ClaudeClientBuilder {
    /// Overrides `CLAUDE_BINARY` and the `claude` found on `PATH`.
    pub fn binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.binary = Some(binary.into());
        self
    }

    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Wall-clock limit per run. Unset by default: agent runs with tool use
    /// routinely take many minutes.
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = Some(model.into());
        self
    }

    pub fn default_event_handler(mut self, handler: Arc<dyn EventHandler>) -> Self {
        self.default_event_handler = Some(handler);
        self
    }

    pub fn observability(mut self, provider: Arc<dyn ObservabilityProvider>) -> Self {
        self.observability = Some(provider);
        self
    }

    pub fn line_limits(mut self, limits: LineLimits) -> Self {
        self.line_limits = limits;
        self
    }

    pub fn build(mut self) -> ClaudeClient {
        // Avoid any updater side effects by default; callers may override explicitly.
        self.env
            .entry("DISABLE_AUTOUPDATER".to_string())
            .or_insert_with(|| "1".to_string());

        ClaudeClient {
            binary: self.binary,
            working_dir: self.working_dir,
            env: self.env,
            timeout: self.timeout,
            default_model: self.default_model,
            default_event_handler: self.default_event_handler,
            observability: self.observability,
            line_limits: self.line_limits,
        }
    }
}
