use std::{ffi::OsString, path::PathBuf};

/// Arguments for one `codex exec --json` invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodexExecRequest {
    pub(crate) prompt: String,
    pub(crate) system_prompt: Option<String>,
    pub(crate) model: Option<String>,
    pub(crate) last_message_file: Option<PathBuf>,
}

impl CodexExecRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Self::default()
        }
    }

    pub fn system_prompt(mut self, prompt: Option<String>) -> Self {
        self.system_prompt = prompt;
        self
    }

    pub fn model(mut self, model: Option<String>) -> Self {
        self.model = model;
        self
    }

    /// Where the CLI writes its final assistant message (`-o`).
    pub fn last_message_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.last_message_file = Some(path.into());
        self
    }

    pub fn argv(&self) -> Vec<OsString> {
        let mut out: Vec<OsString> = vec!["exec".into(), "--json".into()];

        if let Some(path) = self.last_message_file.as_ref() {
            out.push("-o".into());
            out.push(path.clone().into_os_string());
        }

        if let Some(model) = self.model.as_ref().filter(|m| !m.is_empty()) {
            out.push("-m".into());
            out.push(model.into());
        }

        out.push(compose_prompt(self.system_prompt.as_deref(), &self.prompt).into());
        out
    }
}

/// Folds a system prompt into the user prompt; `codex exec` has no separate flag.
pub fn compose_prompt(system_prompt: Option<&str>, prompt: &str) -> String {
    match system_prompt.filter(|s| !s.is_empty()) {
        Some(system) => format!("System instructions:\n{system}\n\nUser prompt:\n{prompt}"),
        None => prompt.to_string(),
    }
}
