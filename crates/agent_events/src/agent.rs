use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::{AgentResult, RunError, RunOptions};

/// A coding-agent backend that turns a prompt into a final answer.
#[async_trait]
pub trait Agent: Send + Sync {
    async fn run(
        &self,
        cancel: &CancellationToken,
        prompt: &str,
        options: RunOptions,
    ) -> Result<AgentResult, RunError>;
}
