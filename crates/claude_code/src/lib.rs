#![forbid(unsafe_code)]
//! Async helper around the Claude Code CLI (`claude`) focused on the headless
//! `-p --output-format stream-json` flow.
//!
//! Each run streams the CLI's envelope lines through [`ClaudeAdapter`] and
//! returns the final `result` text. Events, the output tee and the completion
//! record follow the shared contract in [`agent_events`].

mod adapter;
mod builder;
mod client;
pub mod models;
mod request;
pub mod stream_json;

pub use adapter::ClaudeAdapter;
pub use builder::ClaudeClientBuilder;
pub use client::ClaudeClient;
pub use request::{ClaudePrintRequest, MAX_OUTPUT_TOKENS_ENV};
