use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, info, warn};

use crate::{estimate_tokens, EventHandler, EventPayload, NormalizedEvent};

/// Renders each normalized event as one structured `tracing` event.
///
/// Assistant and tool text is summarized by size unless content logging is
/// enabled. A rough token estimate of the streamed text is kept so long runs
/// can be compared against a context window.
#[derive(Debug, Default)]
pub struct TracingHandler {
    agent: Option<String>,
    log_content: bool,
    context_window: Option<u64>,
    streamed_tokens: AtomicU64,
}

impl TracingHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tags every log line with `agent`.
    pub fn agent(mut self, name: impl Into<String>) -> Self {
        self.agent = Some(name.into());
        self
    }

    pub fn log_content(mut self, enabled: bool) -> Self {
        self.log_content = enabled;
        self
    }

    pub fn context_window(mut self, tokens: u64) -> Self {
        self.context_window = Some(tokens);
        self
    }

    /// Estimated tokens of assistant and tool text seen so far.
    pub fn streamed_tokens(&self) -> u64 {
        self.streamed_tokens.load(Ordering::Relaxed)
    }

    fn count(&self, text: &str) -> u64 {
        let tokens = estimate_tokens(text);
        self.streamed_tokens.fetch_add(tokens, Ordering::Relaxed) + tokens
    }

    fn content<'a>(&self, text: &'a str) -> &'a str {
        if self.log_content {
            text
        } else {
            ""
        }
    }
}

impl EventHandler for TracingHandler {
    fn handle(&self, event: NormalizedEvent) {
        let agent = self.agent.as_deref().unwrap_or("");
        let kind = event.kind().as_str();
        match &event.payload {
            EventPayload::System {
                session_id,
                subtype,
            } => {
                info!(agent, kind, session_id = %session_id, subtype = subtype.as_deref().unwrap_or(""), "agent session");
            }
            EventPayload::AssistantStart => debug!(agent, kind, "assistant turn started"),
            EventPayload::AssistantText { text } => {
                let tokens = self.count(text);
                let window_pct = self
                    .context_window
                    .filter(|w| *w > 0)
                    .map(|w| tokens as f64 * 100.0 / w as f64);
                info!(
                    agent,
                    kind,
                    bytes = text.len(),
                    est_tokens = tokens,
                    window_pct,
                    text = self.content(text),
                    "assistant text"
                );
            }
            EventPayload::ToolUse { id, name, input } => {
                info!(agent, kind, tool_id = %id, tool = %name, input = %input, "tool use");
            }
            EventPayload::ToolResult { tool_id, text } => {
                self.count(text);
                info!(agent, kind, tool_id = %tool_id, bytes = text.len(), text = self.content(text), "tool result");
            }
            EventPayload::Result(summary) => {
                info!(
                    agent,
                    kind,
                    cost_usd = summary.cost_usd,
                    duration_ms = summary.duration_ms,
                    num_turns = summary.num_turns,
                    bytes = summary.text.len(),
                    "run finished"
                );
            }
            EventPayload::ResultError(summary) => {
                warn!(
                    agent,
                    kind,
                    cost_usd = summary.cost_usd,
                    duration_ms = summary.duration_ms,
                    num_turns = summary.num_turns,
                    error = %summary.text,
                    "run failed"
                );
            }
            EventPayload::Phase { name } => info!(agent, kind, phase = %name, "phase"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn streamed_tokens_accumulate_across_text_events() {
        let handler = TracingHandler::new().agent("test").context_window(200_000);
        handler.handle(NormalizedEvent::new(EventPayload::AssistantText {
            text: "abcdefgh".to_string(),
        }));
        handler.handle(NormalizedEvent::new(EventPayload::ToolResult {
            tool_id: "t1".to_string(),
            text: "abcd".to_string(),
        }));
        handler.handle(NormalizedEvent::phase("review"));
        assert_eq!(handler.streamed_tokens(), 3);
    }
}
