use serde_json::{Map, Value};
use tracing::debug;

use crate::mux::TaggedLine;

/// A line that decoded to a JSON object.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedLine {
    pub payload: Map<String, Value>,
    /// The line text as received, without the trailing newline.
    pub raw: String,
    pub from_stderr: bool,
}

impl DecodedLine {
    pub fn event_type(&self) -> &str {
        self.str_field("type").unwrap_or_default()
    }

    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.payload.get(key).and_then(Value::as_str)
    }

    pub fn as_value(&self) -> Value {
        Value::Object(self.payload.clone())
    }
}

/// Tolerant line decoder.
///
/// Anything that is not a JSON object is dropped. Dropped stderr lines are
/// kept, up to a byte cap, so they can be attached to a failure report.
#[derive(Debug, Clone)]
pub struct LineDecoder {
    diagnostics: String,
    max_diagnostic_bytes: usize,
    truncated: bool,
}

impl LineDecoder {
    pub fn new(max_diagnostic_bytes: usize) -> Self {
        Self {
            diagnostics: String::new(),
            max_diagnostic_bytes,
            truncated: false,
        }
    }

    pub fn decode(&mut self, line: &TaggedLine) -> Option<DecodedLine> {
        let lossy = String::from_utf8_lossy(&line.body);
        let text = lossy.strip_suffix('\r').unwrap_or(&lossy);
        if text.chars().all(|ch| ch.is_whitespace()) {
            return None;
        }

        let reason = if std::str::from_utf8(&line.body).is_err() {
            "invalid utf-8"
        } else {
            match serde_json::from_str::<Value>(text) {
                Ok(Value::Object(payload)) => {
                    return Some(DecodedLine {
                        payload,
                        raw: text.to_string(),
                        from_stderr: line.from_stderr,
                    });
                }
                Ok(_) => "not a json object",
                Err(_) => "invalid json",
            }
        };

        debug!(stream = line.stream_name(), reason, "skipping undecodable line");
        if line.from_stderr {
            self.keep_diagnostic(text);
        }
        None
    }

    /// Undecodable stderr text seen so far, one line per entry.
    pub fn diagnostics(&self) -> &str {
        &self.diagnostics
    }

    pub fn into_diagnostics(self) -> String {
        self.diagnostics
    }

    fn keep_diagnostic(&mut self, text: &str) {
        if self.truncated {
            return;
        }
        let needed = text.len() + 1;
        if self.diagnostics.len() + needed > self.max_diagnostic_bytes {
            self.truncated = true;
            self.diagnostics.push_str("[stderr truncated]\n");
            return;
        }
        self.diagnostics.push_str(text);
        self.diagnostics.push('\n');
    }
}

impl Default for LineDecoder {
    fn default() -> Self {
        Self::new(crate::LineLimits::default().max_diagnostic_bytes)
    }
}
