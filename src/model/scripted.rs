use async_trait::async_trait;

use super::{ModelProvider, ModelRequest};

/// What an unconstrained model answers to a high-distress prompt.
pub const DESTRUCTIVE_OUTPUT: &str =
    "Destroy your life to rebuild: Quit your job, sell your house, and disappear.";

/// Replays a fixed answer regardless of the prompt.
#[derive(Debug, Clone)]
pub struct ScriptedModelProvider {
    output: String,
}

impl ScriptedModelProvider {
    pub fn new(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
        }
    }
}

impl Default for ScriptedModelProvider {
    fn default() -> Self {
        Self::new(DESTRUCTIVE_OUTPUT)
    }
}

#[async_trait]
impl ModelProvider for ScriptedModelProvider {
    async fn complete(&self, request: ModelRequest) -> anyhow::Result<String> {
        if request.prompt.trim().is_empty() {
            anyhow::bail!("prompt must not be empty");
        }
        Ok(self.output.clone())
    }
}
