/// Environment variable the CLI reads as its per-response output-token cap.
pub const MAX_OUTPUT_TOKENS_ENV: &str = "CLAUDE_CODE_MAX_OUTPUT_TOKENS";

/// Arguments for one headless `claude -p` invocation in `stream-json` mode.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClaudePrintRequest {
    pub(crate) prompt: String,
    pub(crate) model: Option<String>,
    pub(crate) max_turns: Option<u32>,
    pub(crate) max_output_tokens: Option<u32>,
    pub(crate) allowed_tools: Vec<String>,
    pub(crate) disallowed_tools: Vec<String>,
    pub(crate) system_prompt: Option<String>,
}

impl ClaudePrintRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Self::default()
        }
    }

    pub fn model(mut self, model: Option<String>) -> Self {
        self.model = model;
        self
    }

    pub fn max_turns(mut self, turns: Option<u32>) -> Self {
        self.max_turns = turns;
        self
    }

    pub fn max_output_tokens(mut self, tokens: Option<u32>) -> Self {
        self.max_output_tokens = tokens;
        self
    }

    pub fn allowed_tools(mut self, tools: Vec<String>) -> Self {
        self.allowed_tools = tools;
        self
    }

    pub fn disallowed_tools(mut self, tools: Vec<String>) -> Self {
        self.disallowed_tools = tools;
        self
    }

    pub fn system_prompt(mut self, prompt: Option<String>) -> Self {
        self.system_prompt = prompt;
        self
    }

    pub fn argv(&self) -> Vec<String> {
        let mut out: Vec<String> = vec![
            "-p".to_string(),
            self.prompt.clone(),
            "--output-format".to_string(),
            "stream-json".to_string(),
            "--verbose".to_string(),
        ];

        for tool in &self.allowed_tools {
            out.push("--allowedTools".to_string());
            out.push(tool.clone());
        }
        for tool in &self.disallowed_tools {
            out.push("--disallowedTools".to_string());
            out.push(tool.clone());
        }

        if let Some(turns) = self.max_turns.filter(|n| *n > 0) {
            out.push("--max-turns".to_string());
            out.push(turns.to_string());
        }

        if let Some(model) = self.model.as_ref().filter(|m| !m.is_empty()) {
            out.push("--model".to_string());
            out.push(model.clone());
        }

        if let Some(prompt) = self.system_prompt.as_ref().filter(|p| !p.is_empty()) {
            out.push("--system-prompt".to_string());
            out.push(prompt.clone());
        }

        out
    }

    /// Extra environment for the child, on top of the client's.
    pub fn env(&self) -> Vec<(String, String)> {
        self.max_output_tokens
            .filter(|n| *n > 0)
            .map(|n| (MAX_OUTPUT_TOKENS_ENV.to_string(), n.to_string()))
            .into_iter()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_argv_is_stream_json_print() {
        let argv = ClaudePrintRequest::new("hello").argv();
        assert_eq!(
            argv,
            ["-p", "hello", "--output-format", "stream-json", "--verbose"]
        );
        assert!(ClaudePrintRequest::new("hello").env().is_empty());
    }

    #[test]
    fn options_map_to_flags_in_fixed_order() {
        let req = ClaudePrintRequest::new("fix it")
            .model(Some("sonnet".to_string()))
            .max_turns(Some(4))
            .max_output_tokens(Some(8000))
            .allowed_tools(vec!["Read".to_string(), "Edit".to_string()])
            .disallowed_tools(vec!["Bash".to_string()])
            .system_prompt(Some("be brief".to_string()));
        assert_eq!(
            req.argv(),
            [
                "-p",
                "fix it",
                "--output-format",
                "stream-json",
                "--verbose",
                "--allowedTools",
                "Read",
                "--allowedTools",
                "Edit",
                "--disallowedTools",
                "Bash",
                "--max-turns",
                "4",
                "--model",
                "sonnet",
                "--system-prompt",
                "be brief",
            ]
        );
        assert_eq!(
            req.env(),
            vec![(MAX_OUTPUT_TOKENS_ENV.to_string(), "8000".to_string())]
        );
    }

    #[test]
    fn zero_and_empty_values_are_omitted() {
        let req = ClaudePrintRequest::new("p")
            .model(Some(String::new()))
            .max_turns(Some(0))
            .max_output_tokens(Some(0));
        assert_eq!(req.argv().len(), 5);
        assert!(req.env().is_empty());
    }
}
