use agent_events::{
    Adapter, DecodedLine, Dispatch, EventPayload, NormalizedEvent, ResultSummary, RunOptionKind,
    RunState,
};
use tracing::debug;

use crate::stream_json::{ClaudeStreamEvent, ContentBlock, ResultEnvelope, StreamMessage};

/// Maps Claude Code `stream-json` lines onto normalized events.
#[derive(Debug, Clone, Default)]
pub struct ClaudeAdapter;

impl ClaudeAdapter {
    pub fn new() -> Self {
        Self
    }

    fn system(
        &self,
        line: &DecodedLine,
        subtype: Option<String>,
        session_id: Option<String>,
        state: &mut RunState,
        dispatch: &Dispatch,
    ) {
        let session_id = session_id.unwrap_or_default();
        if !session_id.is_empty() {
            state.session_id = Some(session_id.clone());
        }
        let init = subtype.as_deref() == Some("init");
        dispatch.emit(NormalizedEvent::with_raw(
            EventPayload::System {
                session_id,
                subtype,
            },
            &line.raw,
        ));
        if init {
            dispatch.emit(NormalizedEvent::assistant_start());
        }
    }

    fn assistant(
        &self,
        line: &DecodedLine,
        message: StreamMessage,
        state: &mut RunState,
        dispatch: &mut Dispatch,
    ) {
        for block in message.content.into_blocks() {
            match block {
                ContentBlock::Text { text } => {
                    state.append_text(&text);
                    dispatch.tee(&text);
                    dispatch.emit(NormalizedEvent::with_raw(
                        EventPayload::AssistantText { text },
                        &line.raw,
                    ));
                }
                ContentBlock::ToolUse { id, name, input } => {
                    dispatch.emit(NormalizedEvent::with_raw(
                        EventPayload::ToolUse { id, name, input },
                        &line.raw,
                    ));
                }
                ContentBlock::ToolResult { .. } | ContentBlock::Other => {}
            }
        }
    }

    fn user(&self, line: &DecodedLine, message: StreamMessage, dispatch: &Dispatch) {
        let mut saw_tool_result = false;
        for block in message.content.into_blocks() {
            if let ContentBlock::ToolResult {
                tool_use_id,
                content,
            } = block
            {
                saw_tool_result = true;
                dispatch.emit(NormalizedEvent::with_raw(
                    EventPayload::ToolResult {
                        tool_id: tool_use_id,
                        text: content.map(|c| c.text()).unwrap_or_default(),
                    },
                    &line.raw,
                ));
            }
        }
        // Tool output goes back to the model, which starts a new turn.
        if saw_tool_result {
            dispatch.emit(NormalizedEvent::assistant_start());
        }
    }

    fn result(
        &self,
        line: &DecodedLine,
        result: ResultEnvelope,
        state: &mut RunState,
        dispatch: &Dispatch,
    ) {
        let is_error = result.is_failure();
        let (cost_usd, duration_ms, num_turns) = (result.cost(), result.duration(), result.turns());

        if let Some(id) = result.session_id.filter(|id| !id.is_empty()) {
            state.session_id = Some(id);
        }
        state.cost_usd = cost_usd;
        state.duration_ms = duration_ms;
        state.num_turns = num_turns;

        // Only the first terminal envelope is dispatched; later ones just
        // refresh the usage figures.
        if state.result_emitted {
            debug!(provider = "claude", "ignoring extra result envelope");
            return;
        }

        let text = result.result.unwrap_or_default();
        state.result_text = Some(text.clone());
        if is_error {
            state.last_error_text = Some(if text.trim().is_empty() {
                "claude reported an error".to_string()
            } else {
                text.clone()
            });
        }
        state.mark_terminal(is_error);

        let summary = ResultSummary {
            text: text.clone(),
            subtype: result.subtype,
            cost_usd,
            duration_ms,
            num_turns,
            is_error,
        };
        let payload = if is_error {
            EventPayload::ResultError(summary)
        } else {
            EventPayload::Result(summary)
        };
        dispatch.emit(NormalizedEvent::with_raw(payload, &line.raw));
        dispatch.record_completion(state, &text, is_error);
    }
}

impl Adapter for ClaudeAdapter {
    fn provider(&self) -> &'static str {
        "claude"
    }

    fn supports(&self, _option: RunOptionKind) -> bool {
        true
    }

    fn classify(&mut self, line: &DecodedLine, state: &mut RunState, dispatch: &mut Dispatch) {
        let event = match ClaudeStreamEvent::from_value(line.as_value()) {
            Ok(event) => event,
            Err(err) => {
                debug!(
                    provider = "claude",
                    stream = if line.from_stderr { "stderr" } else { "stdout" },
                    error = %err,
                    "skipping line with unexpected shape"
                );
                return;
            }
        };

        match event {
            ClaudeStreamEvent::System {
                subtype,
                session_id,
            } => self.system(line, subtype, session_id, state, dispatch),
            ClaudeStreamEvent::Assistant {
                message: Some(message),
            } => self.assistant(line, message, state, dispatch),
            ClaudeStreamEvent::User {
                message: Some(message),
            } => self.user(line, message, dispatch),
            ClaudeStreamEvent::Result(result) => self.result(line, result, state, dispatch),
            ClaudeStreamEvent::Assistant { message: None }
            | ClaudeStreamEvent::User { message: None }
            | ClaudeStreamEvent::Other => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use agent_events::{EventKind, LineDecoder, RunMeta, TaggedLine};

    use super::*;

    struct Fixture {
        adapter: ClaudeAdapter,
        state: RunState,
        dispatch: Dispatch,
        events: Arc<Mutex<Vec<NormalizedEvent>>>,
    }

    impl Fixture {
        fn new() -> Self {
            let events: Arc<Mutex<Vec<NormalizedEvent>>> = Arc::default();
            let sink = events.clone();
            let dispatch = Dispatch::new(RunMeta::default()).with_handler(Some(Arc::new(
                move |ev: NormalizedEvent| sink.lock().unwrap().push(ev),
            )));
            Self {
                adapter: ClaudeAdapter::new(),
                state: RunState::new(),
                dispatch,
                events,
            }
        }

        fn feed(&mut self, json: &str) {
            let line = LineDecoder::default()
                .decode(&TaggedLine {
                    body: json.as_bytes().to_vec(),
                    from_stderr: false,
                })
                .expect("fixture line should decode");
            self.adapter
                .classify(&line, &mut self.state, &mut self.dispatch);
        }

        fn kinds(&self) -> Vec<EventKind> {
            self.events.lock().unwrap().iter().map(|e| e.kind()).collect()
        }
    }

    #[test]
    fn init_opens_the_first_turn() {
        let mut f = Fixture::new();
        f.feed(r#"{"type":"system","subtype":"init","session_id":"sess-1"}"#);
        assert_eq!(f.kinds(), vec![EventKind::System, EventKind::AssistantStart]);
        assert_eq!(f.state.session_id.as_deref(), Some("sess-1"));

        let events = f.events.lock().unwrap();
        assert!(events[0].raw_json.is_some());
        assert!(events[1].raw_json.is_none());
    }

    #[test]
    fn assistant_blocks_emit_in_order() {
        let mut f = Fixture::new();
        f.feed(
            r#"{"type":"assistant","message":{"content":[{"type":"text","text":"Let me look."},{"type":"tool_use","id":"tu_1","name":"Read","input":{"path":"a.rs"}}]}}"#,
        );
        assert_eq!(f.kinds(), vec![EventKind::AssistantText, EventKind::ToolUse]);
        assert_eq!(f.state.assistant_text, "Let me look.");

        let events = f.events.lock().unwrap();
        match &events[1].payload {
            EventPayload::ToolUse { id, name, input } => {
                assert_eq!(id, "tu_1");
                assert_eq!(name, "Read");
                assert_eq!(input["path"], "a.rs");
            }
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[test]
    fn tool_results_are_followed_by_a_new_turn() {
        let mut f = Fixture::new();
        f.feed(
            r#"{"type":"user","message":{"content":[{"type":"tool_result","tool_use_id":"tu_1","content":"fn main() {}"},{"type":"tool_result","tool_use_id":"tu_2","content":[{"type":"text","text":"ok"}]}]}}"#,
        );
        assert_eq!(
            f.kinds(),
            vec![
                EventKind::ToolResult,
                EventKind::ToolResult,
                EventKind::AssistantStart
            ]
        );
        let events = f.events.lock().unwrap();
        assert_eq!(events[0].text(), Some("fn main() {}"));
        assert_eq!(events[1].text(), Some("ok"));
    }

    #[test]
    fn user_message_without_tool_results_emits_nothing() {
        let mut f = Fixture::new();
        f.feed(r#"{"type":"user","message":{"content":"plain prompt echo"}}"#);
        assert!(f.kinds().is_empty());
    }

    #[test]
    fn result_updates_state_and_marks_terminal() {
        let mut f = Fixture::new();
        f.feed(
            r#"{"type":"result","subtype":"success","result":"done","cost_usd":0.5,"duration_ms":1200,"num_turns":3,"is_error":false}"#,
        );
        assert_eq!(f.kinds(), vec![EventKind::Result]);
        assert_eq!(f.state.result_text.as_deref(), Some("done"));
        assert_eq!(f.state.num_turns, 3);
        assert_eq!(f.state.duration_ms, 1200);
        assert!(f.state.result_emitted && !f.state.failed);
        assert!(f.state.completion_recorded);
    }

    #[test]
    fn error_subtype_is_an_error_even_without_flag() {
        let mut f = Fixture::new();
        f.feed(r#"{"type":"result","subtype":"error","result":"","is_error":false}"#);
        assert_eq!(f.kinds(), vec![EventKind::ResultError]);
        assert!(f.state.failed);
        assert_eq!(
            f.state.last_error_text.as_deref(),
            Some("claude reported an error")
        );
    }

    #[test]
    fn wrong_field_types_skip_the_line() {
        let mut f = Fixture::new();
        f.feed(r#"{"type":"result","num_turns":"three"}"#);
        f.feed(r#"{"type":"rate_limit","retry_ms":10}"#);
        assert!(f.kinds().is_empty());
        assert!(!f.state.result_emitted);
    }

    #[test]
    fn result_with_both_cost_keys_is_not_dropped() {
        let mut f = Fixture::new();
        f.feed(
            r#"{"type":"result","subtype":"success","result":"done","cost_usd":0.01,"total_cost_usd":0.02,"duration_ms":null,"num_turns":4,"is_error":false}"#,
        );
        assert_eq!(f.kinds(), vec![EventKind::Result]);
        assert_eq!(f.state.cost_usd, 0.02);
        assert_eq!(f.state.num_turns, 4);
        assert_eq!(f.state.duration_ms, 0);
        assert_eq!(f.state.result_text.as_deref(), Some("done"));
    }

    #[test]
    fn error_result_with_null_counters_still_fails_the_run() {
        let mut f = Fixture::new();
        f.feed(r#"{"type":"result","subtype":"error_during_execution","result":"quota exceeded","num_turns":null,"is_error":true}"#);
        assert_eq!(f.kinds(), vec![EventKind::ResultError]);
        assert!(f.state.failed);
        assert_eq!(f.state.last_error_text.as_deref(), Some("quota exceeded"));
    }

    #[test]
    fn only_the_first_result_is_dispatched() {
        let mut f = Fixture::new();
        f.feed(r#"{"type":"result","subtype":"success","result":"first","num_turns":1}"#);
        f.feed(r#"{"type":"result","subtype":"error","result":"second","num_turns":2,"is_error":true}"#);
        assert_eq!(f.kinds(), vec![EventKind::Result]);
        assert_eq!(f.state.result_text.as_deref(), Some("first"));
        assert!(!f.state.failed);
        assert!(f.state.last_error_text.is_none());
        assert_eq!(f.state.num_turns, 2);
    }
}
