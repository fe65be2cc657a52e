//! Normalization of `codex exec --json` JSONL events.
//!
//! Codex does not publish a stable schema for its event stream, so only a few
//! type strings are matched exactly. Assistant text is found by looking at the
//! type name and probing the usual text-bearing fields.

use std::path::{Path, PathBuf};

use agent_events::{
    Adapter, DecodedLine, Dispatch, EventPayload, NormalizedEvent, ResultSummary, RunOptionKind,
    RunState,
};
use serde_json::{Map, Value};
use tracing::debug;

const DEFAULT_FAILURE_MESSAGE: &str = "codex run failed";

/// Options `codex exec` has no way to honor.
pub fn supports_option(option: RunOptionKind) -> bool {
    !matches!(
        option,
        RunOptionKind::MaxTurns
            | RunOptionKind::MaxOutputTokens
            | RunOptionKind::AllowedTools
            | RunOptionKind::DisallowedTools
    )
}

#[derive(Debug, Clone, Default)]
pub struct CodexAdapter {
    last_message_path: Option<PathBuf>,
}

impl CodexAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prefer the contents of `path` (written via `-o`) as the final text.
    pub fn with_last_message_file(path: impl Into<PathBuf>) -> Self {
        Self {
            last_message_path: Some(path.into()),
        }
    }

    fn thread_started(line: &DecodedLine, state: &mut RunState, dispatch: &Dispatch) {
        let Some(id) = line.str_field("thread_id").filter(|id| !id.is_empty()) else {
            return;
        };
        state.session_id = Some(id.to_string());
        dispatch.emit(NormalizedEvent::with_raw(
            EventPayload::System {
                session_id: id.to_string(),
                subtype: Some("init".to_string()),
            },
            &line.raw,
        ));
    }

    fn turn_failed(line: &DecodedLine, state: &mut RunState, dispatch: &Dispatch) {
        if state.result_emitted {
            debug!(provider = "codex", "ignoring turn failure after terminal event");
            return;
        }
        let message = error_message(&line.payload)
            .unwrap_or(DEFAULT_FAILURE_MESSAGE)
            .to_string();
        state.last_error_text = Some(message.clone());
        state.mark_terminal(true);
        dispatch.emit(NormalizedEvent::with_raw(
            EventPayload::ResultError(ResultSummary {
                text: message,
                subtype: Some("turn.failed".to_string()),
                cost_usd: state.cost_usd,
                duration_ms: state.duration_ms,
                num_turns: state.num_turns,
                is_error: true,
            }),
            &line.raw,
        ));
    }
}

impl Adapter for CodexAdapter {
    fn provider(&self) -> &'static str {
        "codex"
    }

    fn supports(&self, option: RunOptionKind) -> bool {
        supports_option(option)
    }

    fn classify(&mut self, line: &DecodedLine, state: &mut RunState, dispatch: &mut Dispatch) {
        let event_type = line.event_type();
        match event_type {
            "thread.started" => Self::thread_started(line, state, dispatch),
            "turn.started" => {
                state.num_turns += 1;
                dispatch.emit(NormalizedEvent::with_raw(
                    EventPayload::AssistantStart,
                    &line.raw,
                ));
            }
            "turn.failed" => Self::turn_failed(line, state, dispatch),
            _ => {}
        }

        // Any event may carry usage figures; the latest one wins.
        if let Some(cost) = line.payload.get("cost_usd").and_then(Value::as_f64) {
            state.cost_usd = cost;
        }
        if let Some(ms) = line.payload.get("duration_ms").and_then(Value::as_f64) {
            state.duration_ms = ms as i64;
        }

        if let Some(text) = assistant_text(event_type, &line.payload) {
            let text = text.to_string();
            state.append_text(&text);
            dispatch.tee(&text);
            dispatch.emit(NormalizedEvent::with_raw(
                EventPayload::AssistantText { text },
                &line.raw,
            ));
        }
    }

    fn final_text(&self, state: &RunState) -> String {
        if let Some(text) = self.last_message_path.as_deref().and_then(read_last_message) {
            return text;
        }
        state.assistant_text.clone()
    }
}

fn read_last_message(path: &Path) -> Option<String> {
    match std::fs::read_to_string(path) {
        Ok(text) if !text.trim().is_empty() => Some(text),
        Ok(_) => None,
        Err(err) => {
            debug!(path = %path.display(), error = %err, "last-message file unreadable");
            None
        }
    }
}

fn looks_like_assistant_event(event_type: &str) -> bool {
    if event_type.is_empty() || event_type.contains("error") || event_type.contains("failed") {
        return false;
    }
    event_type.contains("assistant")
        || event_type.contains("message")
        || event_type.contains("output_text")
}

fn non_empty_str<'a>(map: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    map.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

/// First non-empty text among the places Codex has been seen to put it.
fn assistant_text<'a>(event_type: &str, payload: &'a Map<String, Value>) -> Option<&'a str> {
    if !looks_like_assistant_event(event_type) {
        return None;
    }

    if let Some(text) = ["delta", "text", "output_text"]
        .iter()
        .find_map(|key| non_empty_str(payload, key))
    {
        return Some(text);
    }

    if let Some(text) = payload
        .get("message")
        .and_then(Value::as_object)
        .and_then(|msg| non_empty_str(msg, "text"))
    {
        return Some(text);
    }

    let item = payload.get("item").and_then(Value::as_object)?;
    if let Some(text) = non_empty_str(item, "text") {
        return Some(text);
    }
    item.get("content")
        .and_then(Value::as_array)?
        .iter()
        .filter_map(Value::as_object)
        .find_map(|block| non_empty_str(block, "text"))
}

fn error_message(payload: &Map<String, Value>) -> Option<&str> {
    non_empty_str(payload, "message").or_else(|| {
        payload
            .get("error")
            .and_then(Value::as_object)
            .and_then(|err| non_empty_str(err, "message"))
    })
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use agent_events::{EventKind, LineDecoder, RunMeta, TaggedLine};
    use serde_json::json;

    use super::*;

    struct Fixture {
        adapter: CodexAdapter,
        state: RunState,
        dispatch: Dispatch,
        events: Arc<Mutex<Vec<NormalizedEvent>>>,
    }

    impl Fixture {
        fn new() -> Self {
            let events: Arc<Mutex<Vec<NormalizedEvent>>> = Arc::default();
            let sink = events.clone();
            Self {
                adapter: CodexAdapter::new(),
                state: RunState::new(),
                dispatch: Dispatch::new(RunMeta::default()).with_handler(Some(Arc::new(
                    move |ev: NormalizedEvent| sink.lock().unwrap().push(ev),
                ))),
                events,
            }
        }

        fn feed(&mut self, value: Value) {
            let line = LineDecoder::default()
                .decode(&TaggedLine {
                    body: value.to_string().into_bytes(),
                    from_stderr: false,
                })
                .expect("fixture line should decode");
            self.adapter
                .classify(&line, &mut self.state, &mut self.dispatch);
        }

        fn kinds(&self) -> Vec<EventKind> {
            self.events.lock().unwrap().iter().map(|e| e.kind()).collect()
        }

        fn texts(&self) -> Vec<String> {
            self.events
                .lock()
                .unwrap()
                .iter()
                .filter(|e| e.kind() == EventKind::AssistantText)
                .filter_map(|e| e.text().map(str::to_string))
                .collect()
        }
    }

    #[test]
    fn thread_and_turn_lifecycle() {
        let mut f = Fixture::new();
        f.feed(json!({"type": "thread.started", "thread_id": "th_1"}));
        f.feed(json!({"type": "thread.started", "thread_id": ""}));
        f.feed(json!({"type": "turn.started"}));
        f.feed(json!({"type": "turn.started"}));

        assert_eq!(
            f.kinds(),
            vec![
                EventKind::System,
                EventKind::AssistantStart,
                EventKind::AssistantStart
            ]
        );
        assert_eq!(f.state.session_id.as_deref(), Some("th_1"));
        assert_eq!(f.state.num_turns, 2);
        let events = f.events.lock().unwrap();
        assert!(events.iter().all(|e| e.raw_json.is_some()));
    }

    #[test]
    fn assistant_text_is_found_in_each_known_location() {
        let mut f = Fixture::new();
        f.feed(json!({"type": "assistant.delta", "delta": "a"}));
        f.feed(json!({"type": "response.output_text.delta", "output_text": "b"}));
        f.feed(json!({"type": "agent_message", "message": {"text": "c"}}));
        f.feed(json!({"type": "item.message", "item": {"text": "d"}}));
        f.feed(json!({"type": "item.message", "item": {"content": [{"type": "image"}, {"text": "e"}]}}));
        f.feed(json!({"type": "message", "delta": "", "text": "f"}));

        assert_eq!(f.texts(), vec!["a", "b", "c", "d", "e", "f"]);
        assert_eq!(f.state.assistant_text, "abcdef");
    }

    #[test]
    fn error_like_types_never_yield_text() {
        let mut f = Fixture::new();
        f.feed(json!({"type": "message.error", "text": "nope"}));
        f.feed(json!({"type": "item.completed", "item": {"text": "not assistant-ish"}}));
        f.feed(json!({"type": "assistant_message"}));
        assert!(f.kinds().is_empty());
        assert!(f.state.assistant_text.is_empty());
    }

    #[test]
    fn turn_failed_takes_message_from_either_place() {
        let mut f = Fixture::new();
        f.feed(json!({"type": "turn.failed", "error": {"message": "rate limited"}}));
        assert_eq!(f.kinds(), vec![EventKind::ResultError]);
        assert_eq!(f.state.last_error_text.as_deref(), Some("rate limited"));
        assert!(f.state.result_emitted && f.state.failed);

        let mut f = Fixture::new();
        f.feed(json!({"type": "turn.failed", "message": "boom", "error": {"message": "inner"}}));
        assert_eq!(f.state.last_error_text.as_deref(), Some("boom"));

        let mut f = Fixture::new();
        f.feed(json!({"type": "turn.failed"}));
        assert_eq!(f.state.last_error_text.as_deref(), Some(DEFAULT_FAILURE_MESSAGE));
    }

    #[test]
    fn only_the_first_turn_failure_is_dispatched() {
        let mut f = Fixture::new();
        f.feed(json!({"type": "turn.failed", "message": "first"}));
        f.feed(json!({"type": "turn.failed", "message": "second"}));
        assert_eq!(f.kinds(), vec![EventKind::ResultError]);
        assert_eq!(f.state.last_error_text.as_deref(), Some("first"));
        assert_eq!(f.events.lock().unwrap()[0].text(), Some("first"));
    }

    #[test]
    fn usage_figures_are_last_write_wins() {
        let mut f = Fixture::new();
        f.feed(json!({"type": "turn.completed", "cost_usd": 0.1, "duration_ms": 100}));
        f.feed(json!({"type": "turn.completed", "cost_usd": 0.3}));
        f.feed(json!({"type": "turn.completed", "duration_ms": 250.9, "cost_usd": "bad"}));
        assert_eq!(f.state.cost_usd, 0.3);
        assert_eq!(f.state.duration_ms, 250);
    }

    #[test]
    fn final_text_prefers_non_empty_last_message_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("last.txt");
        let adapter = CodexAdapter::with_last_message_file(&path);
        let mut state = RunState::new();
        state.append_text("streamed");

        assert_eq!(adapter.final_text(&state), "streamed");
        std::fs::write(&path, "  \n").unwrap();
        assert_eq!(adapter.final_text(&state), "streamed");
        std::fs::write(&path, "from file\n").unwrap();
        assert_eq!(adapter.final_text(&state), "from file\n");
    }

    #[test]
    fn unsupported_options() {
        assert!(supports_option(RunOptionKind::Model));
        assert!(supports_option(RunOptionKind::SystemPrompt));
        assert!(!supports_option(RunOptionKind::MaxTurns));
        assert!(!supports_option(RunOptionKind::AllowedTools));
    }
}
