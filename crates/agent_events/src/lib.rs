#![forbid(unsafe_code)]
//! Streaming event pipeline shared by the Claude Code and Codex CLI wrappers.
//!
//! A run spawns a provider CLI, fans its stdout and stderr into one queue of
//! lines ([`LineMux`]), decodes each line tolerantly ([`LineDecoder`]), hands
//! the result to a provider [`Adapter`] that emits [`NormalizedEvent`]s, and
//! resolves a single terminal outcome once the process exits
//! ([`run_process`]).

mod adapter;
mod agent;
mod config;
mod decode;
mod error;
mod event;
mod extract;
mod handler;
mod mux;
mod observability;
mod options;
mod process;
mod reader;
mod run;
mod state;
mod tokens;

pub use adapter::{Adapter, Dispatch, RunMeta};
pub use agent::Agent;
pub use config::LineLimits;
pub use decode::{DecodedLine, LineDecoder};
pub use error::RunError;
pub use event::{EventHandler, EventKind, EventPayload, NormalizedEvent, ResultSummary};
pub use extract::{extract_json, extract_json_array, strip_code_fences, ExtractJsonError};
pub use handler::TracingHandler;
pub use mux::{LineMux, TaggedLine};
pub use observability::{
    CompletionRecord, Metadata, ObservabilityProvider, TraceConfig, TracingObserver,
};
pub use options::{RunOptionKind, RunOptions};
pub use process::apply_env;
pub use reader::{AsyncBoundedLineReader, LineRead};
pub use run::{run_process, AgentResult, RunRequest};
pub use state::RunState;
pub use tokens::{estimate_tokens, ModelPricing};

pub use tokio_util::sync::CancellationToken;
