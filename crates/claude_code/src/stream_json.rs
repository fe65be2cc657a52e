//! Typed view of the `--output-format stream-json` envelope.
//!
//! Every line is one object discriminated by `type`. Unknown types and
//! unknown content blocks deserialize to `Other` so newer CLI releases do not
//! break parsing.

use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClaudeStreamEvent {
    System {
        #[serde(default)]
        subtype: Option<String>,
        #[serde(default)]
        session_id: Option<String>,
    },
    Assistant {
        #[serde(default)]
        message: Option<StreamMessage>,
    },
    User {
        #[serde(default)]
        message: Option<StreamMessage>,
    },
    Result(ResultEnvelope),
    #[serde(other)]
    Other,
}

impl ClaudeStreamEvent {
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }
}

/// Final envelope of a run.
///
/// Numeric fields tolerate `null` and absence. Older CLI releases send
/// `cost_usd`, newer ones `total_cost_usd`, and some send both.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ResultEnvelope {
    #[serde(default)]
    pub subtype: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default)]
    pub cost_usd: Option<f64>,
    #[serde(default)]
    pub total_cost_usd: Option<f64>,
    #[serde(default)]
    pub duration_ms: Option<i64>,
    #[serde(default)]
    pub num_turns: Option<u32>,
    #[serde(default)]
    pub is_error: Option<bool>,
}

impl ResultEnvelope {
    /// `is_error` alone is not authoritative; an `error` subtype also counts.
    pub fn is_failure(&self) -> bool {
        self.is_error.unwrap_or(false) || self.subtype.as_deref() == Some("error")
    }

    pub fn cost(&self) -> f64 {
        self.total_cost_usd.or(self.cost_usd).unwrap_or_default()
    }

    pub fn duration(&self) -> i64 {
        self.duration_ms.unwrap_or_default()
    }

    pub fn turns(&self) -> u32 {
        self.num_turns.unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct StreamMessage {
    #[serde(default)]
    pub content: MessageContent,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

impl Default for MessageContent {
    fn default() -> Self {
        MessageContent::Blocks(Vec::new())
    }
}

impl MessageContent {
    pub fn into_blocks(self) -> Vec<ContentBlock> {
        match self {
            MessageContent::Text(text) => vec![ContentBlock::Text { text }],
            MessageContent::Blocks(blocks) => blocks,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        #[serde(default)]
        text: String,
    },
    ToolUse {
        #[serde(default)]
        id: String,
        #[serde(default)]
        name: String,
        #[serde(default)]
        input: Value,
    },
    ToolResult {
        #[serde(default)]
        tool_use_id: String,
        #[serde(default)]
        content: Option<ToolResultContent>,
    },
    #[serde(other)]
    Other,
}

/// Tool output is either a plain string or a list of content blocks.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ToolResultContent {
    Text(String),
    Blocks(Vec<Value>),
}

impl ToolResultContent {
    pub fn text(&self) -> String {
        match self {
            ToolResultContent::Text(text) => text.clone(),
            ToolResultContent::Blocks(blocks) => blocks
                .iter()
                .filter_map(|block| block.get("text").and_then(Value::as_str))
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}
