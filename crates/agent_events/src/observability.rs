//! Observability sink contract and a `tracing`-backed implementation.

use serde_json::{Map, Value};
use tracing::info;

/// Free-form key/value data attached to sessions and traces.
pub type Metadata = Map<String, Value>;

/// Receives trace lifecycle calls and one completion record per run.
///
/// Implementations must be safe for concurrent use and must absorb their own
/// failures (log or ignore them); nothing here can fail a run.
pub trait ObservabilityProvider: Send + Sync {
    /// Begins a session grouping related runs and returns its id.
    fn start_session(&self, metadata: &Metadata) -> String;

    /// Begins a trace and returns its id, to be passed to a run via
    /// [`RunOptions::trace_id`](crate::RunOptions::trace_id).
    fn start_trace(&self, config: &TraceConfig, inputs: &Metadata) -> String;

    fn end_trace(&self, trace_id: &str, outputs: &Metadata);

    /// Called by the run orchestrator once a run has a final outcome.
    fn record_completion(&self, record: &CompletionRecord);
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TraceConfig {
    /// Identifier for this kind of trace (e.g. `extract`).
    pub name: String,
    pub display_name: Option<String>,
    pub metadata: Metadata,
}

impl TraceConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// Immutable summary of one finished run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompletionRecord {
    pub trace_id: Option<String>,
    pub session_id: Option<String>,
    pub prompt: String,
    pub response: String,
    pub model: Option<String>,
    pub cost_usd: f64,
    pub duration_ms: i64,
    pub num_turns: u32,
    pub is_error: bool,
}

/// Emits every sink call as a structured `tracing` event at `info`.
#[derive(Debug, Clone, Default)]
pub struct TracingObserver {
    log_content: bool,
}

impl TracingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also log prompt and response text, not just their sizes.
    pub fn log_content(mut self, enabled: bool) -> Self {
        self.log_content = enabled;
        self
    }
}

impl ObservabilityProvider for TracingObserver {
    fn start_session(&self, metadata: &Metadata) -> String {
        let session_id = uuid::Uuid::new_v4().to_string();
        let metadata = Value::Object(metadata.clone());
        info!(session_id = %session_id, metadata = %metadata, "observability session started");
        session_id
    }

    fn start_trace(&self, config: &TraceConfig, inputs: &Metadata) -> String {
        let trace_id = uuid::Uuid::new_v4().to_string();
        info!(
            trace_id = %trace_id,
            name = %config.name,
            display_name = config.display_name.as_deref().unwrap_or(""),
            inputs = inputs.len(),
            "trace started"
        );
        trace_id
    }

    fn end_trace(&self, trace_id: &str, outputs: &Metadata) {
        info!(trace_id, outputs = outputs.len(), "trace ended");
    }

    fn record_completion(&self, record: &CompletionRecord) {
        if self.log_content {
            info!(
                trace_id = record.trace_id.as_deref().unwrap_or(""),
                session_id = record.session_id.as_deref().unwrap_or(""),
                model = record.model.as_deref().unwrap_or(""),
                cost_usd = record.cost_usd,
                duration_ms = record.duration_ms,
                num_turns = record.num_turns,
                is_error = record.is_error,
                prompt = %record.prompt,
                response = %record.response,
                "completion recorded"
            );
        } else {
            info!(
                trace_id = record.trace_id.as_deref().unwrap_or(""),
                session_id = record.session_id.as_deref().unwrap_or(""),
                model = record.model.as_deref().unwrap_or(""),
                cost_usd = record.cost_usd,
                duration_ms = record.duration_ms,
                num_turns = record.num_turns,
                is_error = record.is_error,
                prompt_bytes = record.prompt.len(),
                response_bytes = record.response.len(),
                "completion recorded"
            );
        }
    }
}
