pub mod ollama;

pub use ollama::{OllamaClient, OllamaError, DEFAULT_OLLAMA_URL};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::state::{ChatMessage, ChatRole};

/// One turn of a chat request as sent to the model server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
}

impl ChatTurn {
    pub fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

impl From<&ChatMessage> for ChatTurn {
    fn from(message: &ChatMessage) -> Self {
        Self::new(message.role, message.content.clone())
    }
}

/// Model server that turns a list of chat turns into reply text
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn chat(&self, model: &str, messages: &[ChatTurn]) -> anyhow::Result<String>;

    /// List model names available on the server
    async fn list_models(&self) -> anyhow::Result<Vec<String>>;
}
