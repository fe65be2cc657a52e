use serde::Serialize;
use serde_json::Value;

/// Discriminant of a [`NormalizedEvent`].
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    System,
    AssistantStart,
    #[serde(rename = "assistant")]
    AssistantText,
    ToolUse,
    ToolResult,
    Result,
    ResultError,
    /// Injected by callers to group runs; adapters never produce it.
    Phase,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::System => "system",
            EventKind::AssistantStart => "assistant_start",
            EventKind::AssistantText => "assistant",
            EventKind::ToolUse => "tool_use",
            EventKind::ToolResult => "tool_result",
            EventKind::Result => "result",
            EventKind::ResultError => "result_error",
            EventKind::Phase => "phase",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, EventKind::Result | EventKind::ResultError)
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Final figures reported with a terminal event.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResultSummary {
    pub text: String,
    pub subtype: Option<String>,
    pub cost_usd: f64,
    pub duration_ms: i64,
    pub num_turns: u32,
    pub is_error: bool,
}

/// Per-kind fields. Serializes with a `type` tag matching
/// [`EventKind::as_str`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventPayload {
    System {
        session_id: String,
        subtype: Option<String>,
    },
    AssistantStart,
    #[serde(rename = "assistant")]
    AssistantText {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    ToolResult {
        tool_id: String,
        text: String,
    },
    Result(ResultSummary),
    ResultError(ResultSummary),
    Phase {
        name: String,
    },
}

/// A provider-independent occurrence observed during a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedEvent {
    #[serde(flatten)]
    pub payload: EventPayload,
    /// The provider line this event was decoded from, when there was one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_json: Option<String>,
}

impl NormalizedEvent {
    pub fn new(payload: EventPayload) -> Self {
        Self {
            payload,
            raw_json: None,
        }
    }

    pub fn with_raw(payload: EventPayload, raw: &str) -> Self {
        Self {
            payload,
            raw_json: Some(raw.to_string()),
        }
    }

    pub fn assistant_start() -> Self {
        Self::new(EventPayload::AssistantStart)
    }

    /// Marks a phase boundary for downstream grouping.
    pub fn phase(name: impl Into<String>) -> Self {
        Self::new(EventPayload::Phase { name: name.into() })
    }

    pub fn kind(&self) -> EventKind {
        match &self.payload {
            EventPayload::System { .. } => EventKind::System,
            EventPayload::AssistantStart => EventKind::AssistantStart,
            EventPayload::AssistantText { .. } => EventKind::AssistantText,
            EventPayload::ToolUse { .. } => EventKind::ToolUse,
            EventPayload::ToolResult { .. } => EventKind::ToolResult,
            EventPayload::Result(_) => EventKind::Result,
            EventPayload::ResultError(_) => EventKind::ResultError,
            EventPayload::Phase { .. } => EventKind::Phase,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.kind().is_terminal()
    }

    /// Primary text carried by the event, if the kind has one.
    pub fn text(&self) -> Option<&str> {
        match &self.payload {
            EventPayload::AssistantText { text } | EventPayload::ToolResult { text, .. } => {
                Some(text)
            }
            EventPayload::Result(summary) | EventPayload::ResultError(summary) => {
                Some(&summary.text)
            }
            _ => None,
        }
    }

    pub fn summary(&self) -> Option<&ResultSummary> {
        match &self.payload {
            EventPayload::Result(summary) | EventPayload::ResultError(summary) => Some(summary),
            _ => None,
        }
    }
}

/// Receives normalized events synchronously, in decode order.
///
/// Implementations must return promptly: a blocked handler stalls the run
/// that is dispatching to it. Handlers shared across concurrent runs must be
/// safe for concurrent invocation.
pub trait EventHandler: Send + Sync {
    fn handle(&self, event: NormalizedEvent);
}

impl<F> EventHandler for F
where
    F: Fn(NormalizedEvent) + Send + Sync,
{
    fn handle(&self, event: NormalizedEvent) {
        self(event)
    }
}
