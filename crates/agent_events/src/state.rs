/// Running fold of one run's decoded output.
///
/// Created fresh per run and mutated only by the decode loop. Cost, duration
/// and turn figures are last-write-wins unless an adapter says otherwise.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunState {
    pub session_id: Option<String>,
    /// Every assistant text chunk, concatenated in arrival order.
    pub assistant_text: String,
    pub last_error_text: Option<String>,
    /// Final text carried by a decoded terminal event.
    pub result_text: Option<String>,
    pub cost_usd: f64,
    pub duration_ms: i64,
    pub num_turns: u32,
    /// A terminal event has been dispatched; exit handling must not add another.
    pub result_emitted: bool,
    /// The dispatched terminal event reported an error.
    pub failed: bool,
    pub completion_recorded: bool,
}

impl RunState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append_text(&mut self, text: &str) {
        self.assistant_text.push_str(text);
    }

    pub fn mark_terminal(&mut self, is_error: bool) {
        self.result_emitted = true;
        self.failed = is_error;
    }

    /// Best available description of why the run failed.
    pub fn failure_text<'a>(&'a self, diagnostics: &'a str) -> &'a str {
        match self.last_error_text.as_deref() {
            Some(text) if !text.trim().is_empty() => text,
            _ => diagnostics.trim_end(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_text_prefers_decoded_error() {
        let mut state = RunState::new();
        assert_eq!(state.failure_text("stderr says no\n"), "stderr says no");

        state.last_error_text = Some("boom".to_string());
        assert_eq!(state.failure_text("stderr says no\n"), "boom");

        state.last_error_text = Some("  ".to_string());
        assert_eq!(state.failure_text(""), "");
    }

    #[test]
    fn mark_terminal_records_error_flag() {
        let mut state = RunState::new();
        state.mark_terminal(true);
        assert!(state.result_emitted && state.failed);
        state.append_text("a");
        state.append_text("b");
        assert_eq!(state.assistant_text, "ab");
    }
}
