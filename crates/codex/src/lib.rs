#![forbid(unsafe_code)]
//! Async helper around the Codex CLI (`codex exec --json`).
//!
//! - Defaults pull `CODEX_BINARY` or `codex` on `PATH`; call
//!   [`CodexClientBuilder::binary`] to pin a specific binary.
//! - Each run passes `-o <temp file>` so the CLI's final message can be read
//!   back; the file is removed when the run ends.
//! - `codex exec` has no flags for turn limits, output-token caps or tool
//!   allow/deny lists. Requesting them fails with
//!   [`agent_events::RunError::UnsupportedOption`] before spawning.

mod builder;
mod client;
mod defaults;
mod exec;
mod jsonl;

pub use builder::CodexClientBuilder;
pub use client::CodexClient;
pub use exec::{compose_prompt, CodexExecRequest};
pub use jsonl::{supports_option, CodexAdapter};
