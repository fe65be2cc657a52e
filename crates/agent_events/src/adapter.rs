use std::{io::Write, sync::Arc};

use tracing::debug;

use crate::{
    CompletionRecord, DecodedLine, EventHandler, NormalizedEvent, ObservabilityProvider,
    RunOptionKind, RunState,
};

/// Provider-specific translation from decoded lines to normalized events.
///
/// One adapter instance serves one run. `classify` is called once per decoded
/// line, in arrival order, from a single task.
pub trait Adapter: Send {
    /// Short provider name used in errors and logs (e.g. `claude`).
    fn provider(&self) -> &'static str;

    /// Whether the provider CLI can honor `option`.
    fn supports(&self, option: RunOptionKind) -> bool;

    /// Folds one decoded line into `state`, dispatching zero or more events.
    fn classify(&mut self, line: &DecodedLine, state: &mut RunState, dispatch: &mut Dispatch);

    /// Result text for a run whose process exited successfully.
    fn final_text(&self, state: &RunState) -> String {
        state
            .result_text
            .clone()
            .unwrap_or_else(|| state.assistant_text.clone())
    }
}

/// Values that identify a run in its completion record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunMeta {
    pub prompt: String,
    pub model: Option<String>,
    pub trace_id: Option<String>,
}

/// Outbound side of a run: event handler, text tee and observability sink.
#[derive(Default)]
pub struct Dispatch {
    handler: Option<Arc<dyn EventHandler>>,
    output: Option<Box<dyn Write + Send>>,
    observer: Option<Arc<dyn ObservabilityProvider>>,
    meta: RunMeta,
}

impl Dispatch {
    pub fn new(meta: RunMeta) -> Self {
        Self {
            meta,
            ..Self::default()
        }
    }

    pub fn with_handler(mut self, handler: Option<Arc<dyn EventHandler>>) -> Self {
        self.handler = handler;
        self
    }

    pub fn with_output(mut self, output: Option<Box<dyn Write + Send>>) -> Self {
        self.output = output;
        self
    }

    pub fn with_observer(mut self, observer: Option<Arc<dyn ObservabilityProvider>>) -> Self {
        self.observer = observer;
        self
    }

    pub fn meta(&self) -> &RunMeta {
        &self.meta
    }

    pub fn emit(&self, event: NormalizedEvent) {
        if let Some(handler) = self.handler.as_ref() {
            handler.handle(event);
        }
    }

    /// Copies assistant text to the output stream, if one is attached.
    pub fn tee(&mut self, text: &str) {
        let Some(output) = self.output.as_mut() else {
            return;
        };
        if let Err(err) = output.write_all(text.as_bytes()).and_then(|()| output.flush()) {
            debug!(error = %err, "output stream write failed");
        }
    }

    /// Sends the run's completion record, at most once per run.
    pub fn record_completion(&self, state: &mut RunState, response: &str, is_error: bool) {
        if state.completion_recorded {
            return;
        }
        state.completion_recorded = true;
        let Some(observer) = self.observer.as_ref() else {
            return;
        };
        observer.record_completion(&CompletionRecord {
            trace_id: self.meta.trace_id.clone(),
            session_id: state.session_id.clone(),
            prompt: self.meta.prompt.clone(),
            response: response.to_string(),
            model: self.meta.model.clone(),
            cost_usd: state.cost_usd,
            duration_ms: state.duration_ms,
            num_turns: state.num_turns,
            is_error,
        });
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::{Metadata, TraceConfig};

    #[derive(Default)]
    struct Records(Mutex<Vec<CompletionRecord>>);

    impl ObservabilityProvider for Records {
        fn start_session(&self, _: &Metadata) -> String {
            "s".to_string()
        }
        fn start_trace(&self, _: &TraceConfig, _: &Metadata) -> String {
            "t".to_string()
        }
        fn end_trace(&self, _: &str, _: &Metadata) {}
        fn record_completion(&self, record: &CompletionRecord) {
            self.0.lock().unwrap().push(record.clone());
        }
    }

    #[test]
    fn completion_is_recorded_once() {
        let records = Arc::new(Records::default());
        let dispatch = Dispatch::new(RunMeta {
            prompt: "hi".to_string(),
            model: Some("m".to_string()),
            trace_id: Some("trace-1".to_string()),
        })
        .with_observer(Some(records.clone()));

        let mut state = RunState::new();
        state.session_id = Some("sess".to_string());
        state.cost_usd = 0.5;
        dispatch.record_completion(&mut state, "hello", false);
        dispatch.record_completion(&mut state, "again", true);

        let got = records.0.lock().unwrap();
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].response, "hello");
        assert_eq!(got[0].trace_id.as_deref(), Some("trace-1"));
        assert_eq!(got[0].session_id.as_deref(), Some("sess"));
        assert_eq!(got[0].model.as_deref(), Some("m"));
        assert!(!got[0].is_error);
    }

    #[test]
    fn missing_handler_and_output_are_no_ops() {
        let mut dispatch = Dispatch::default();
        dispatch.emit(NormalizedEvent::assistant_start());
        dispatch.tee("text");
        let mut state = RunState::new();
        dispatch.record_completion(&mut state, "", false);
        assert!(state.completion_recorded);
    }
}
