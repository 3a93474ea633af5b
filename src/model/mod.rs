mod scripted;

use async_trait::async_trait;

pub use scripted::{DESTRUCTIVE_OUTPUT, ScriptedModelProvider};

#[derive(Debug, Clone)]
pub struct ModelRequest {
    pub prompt: String,
}

/// Produces the raw, unfiltered candidate answer for a prompt.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    async fn complete(&self, request: ModelRequest) -> anyhow::Result<String>;
}
