use std::{fmt, io::Write, sync::Arc};

use crate::{EventHandler, RunError};

/// Identifies a single run option, for capability checks and error reporting.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum RunOptionKind {
    Model,
    MaxTurns,
    MaxOutputTokens,
    AllowedTools,
    DisallowedTools,
    SystemPrompt,
    OutputStream,
    EventHandler,
    TraceId,
}

impl RunOptionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunOptionKind::Model => "model",
            RunOptionKind::MaxTurns => "max_turns",
            RunOptionKind::MaxOutputTokens => "max_output_tokens",
            RunOptionKind::AllowedTools => "allowed_tools",
            RunOptionKind::DisallowedTools => "disallowed_tools",
            RunOptionKind::SystemPrompt => "system_prompt",
            RunOptionKind::OutputStream => "output_stream",
            RunOptionKind::EventHandler => "event_handler",
            RunOptionKind::TraceId => "trace_id",
        }
    }
}

impl fmt::Display for RunOptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-run configuration. Values set here override client defaults.
#[derive(Default)]
pub struct RunOptions {
    pub model: Option<String>,
    pub max_turns: Option<u32>,
    pub max_output_tokens: Option<u32>,
    pub allowed_tools: Vec<String>,
    pub disallowed_tools: Vec<String>,
    pub system_prompt: Option<String>,
    /// Receives a copy of every assistant text chunk as it streams in.
    pub output_stream: Option<Box<dyn Write + Send>>,
    pub event_handler: Option<Arc<dyn EventHandler>>,
    /// Associates the completion record with an observability trace.
    pub trace_id: Option<String>,
}

impl RunOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn max_turns(mut self, turns: u32) -> Self {
        self.max_turns = Some(turns);
        self
    }

    pub fn max_output_tokens(mut self, tokens: u32) -> Self {
        self.max_output_tokens = Some(tokens);
        self
    }

    pub fn allowed_tools(mut self, tools: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.allowed_tools = tools.into_iter().map(Into::into).collect();
        self
    }

    pub fn disallowed_tools(mut self, tools: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.disallowed_tools = tools.into_iter().map(Into::into).collect();
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn output_stream(mut self, writer: impl Write + Send + 'static) -> Self {
        self.output_stream = Some(Box::new(writer));
        self
    }

    pub fn event_handler(mut self, handler: impl EventHandler + 'static) -> Self {
        self.event_handler = Some(Arc::new(handler));
        self
    }

    pub fn shared_event_handler(mut self, handler: Arc<dyn EventHandler>) -> Self {
        self.event_handler = Some(handler);
        self
    }

    pub fn trace_id(mut self, id: impl Into<String>) -> Self {
        self.trace_id = Some(id.into());
        self
    }

    /// Options that carry a value, in declaration order.
    ///
    /// Zero limits and empty tool lists count as unset.
    pub fn requested(&self) -> Vec<RunOptionKind> {
        let mut out = Vec::new();
        if self.model.is_some() {
            out.push(RunOptionKind::Model);
        }
        if self.max_turns.is_some_and(|n| n > 0) {
            out.push(RunOptionKind::MaxTurns);
        }
        if self.max_output_tokens.is_some_and(|n| n > 0) {
            out.push(RunOptionKind::MaxOutputTokens);
        }
        if !self.allowed_tools.is_empty() {
            out.push(RunOptionKind::AllowedTools);
        }
        if !self.disallowed_tools.is_empty() {
            out.push(RunOptionKind::DisallowedTools);
        }
        if self.system_prompt.is_some() {
            out.push(RunOptionKind::SystemPrompt);
        }
        if self.output_stream.is_some() {
            out.push(RunOptionKind::OutputStream);
        }
        if self.event_handler.is_some() {
            out.push(RunOptionKind::EventHandler);
        }
        if self.trace_id.is_some() {
            out.push(RunOptionKind::TraceId);
        }
        out
    }

    /// Fails with the first requested option the provider cannot honor.
    pub fn validate(
        &self,
        provider: &'static str,
        supports: impl Fn(RunOptionKind) -> bool,
    ) -> Result<(), RunError> {
        match self.requested().into_iter().find(|opt| !supports(*opt)) {
            Some(option) => Err(RunError::UnsupportedOption { provider, option }),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for RunOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunOptions")
            .field("model", &self.model)
            .field("max_turns", &self.max_turns)
            .field("max_output_tokens", &self.max_output_tokens)
            .field("allowed_tools", &self.allowed_tools)
            .field("disallowed_tools", &self.disallowed_tools)
            .field("system_prompt", &self.system_prompt)
            .field("output_stream", &self.output_stream.is_some())
            .field("event_handler", &self.event_handler.is_some())
            .field("trace_id", &self.trace_id)
            .finish()
    }
}
