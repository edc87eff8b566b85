use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use super::{ChatBackend, ChatTurn};

/// Default Ollama server URL
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// Errors from the Ollama client
#[derive(Debug, Error)]
pub enum OllamaError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Ollama API error: {0}")]
    Api(String),
    #[error("Ollama server not running at {0}. Start it with: ollama serve")]
    ServerNotRunning(String),
}

#[derive(Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatTurn],
    stream: bool,
}

#[derive(Deserialize)]
struct OllamaChatMessage {
    content: String,
}

#[derive(Deserialize)]
struct OllamaChatResponse {
    message: Option<OllamaChatMessage>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize)]
struct OllamaErrorBody {
    error: String,
}

#[derive(Deserialize)]
struct OllamaModel {
    name: String,
}

#[derive(Deserialize)]
struct OllamaModelsResponse {
    models: Vec<OllamaModel>,
}

#[derive(Clone)]
pub struct OllamaClient {
    client: Client,
    base_url: String,
}

impl OllamaClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send a non-streaming chat request and return the reply text
    pub async fn chat(&self, model: &str, messages: &[ChatTurn]) -> Result<String, OllamaError> {
        let url = format!("{}/api/chat", self.base_url);

        let request = OllamaChatRequest {
            model,
            messages,
            stream: false,
        };

        debug!(model, turns = messages.len(), "sending chat request");

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    OllamaError::ServerNotRunning(self.base_url.clone())
                } else {
                    OllamaError::Http(e)
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<OllamaErrorBody>(&text)
                .map(|body| body.error)
                .unwrap_or(text);
            return Err(OllamaError::Api(format!("{}: {}", status, detail)));
        }

        let chat_response: OllamaChatResponse = response.json().await?;
        if let Some(error) = chat_response.error {
            return Err(OllamaError::Api(error));
        }

        chat_response
            .message
            .map(|m| m.content)
            .ok_or_else(|| OllamaError::Api("response contained no message".to_string()))
    }

    pub async fn list_models(&self) -> Result<Vec<String>, OllamaError> {
        let url = format!("{}/api/tags", self.base_url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|_| OllamaError::ServerNotRunning(self.base_url.clone()))?;

        if !response.status().is_success() {
            return Err(OllamaError::Api(format!(
                "Failed to list models: {}",
                response.status()
            )));
        }

        let models_response: OllamaModelsResponse = response.json().await?;
        let model_names: Vec<String> = models_response
            .models
            .into_iter()
            .map(|model| model.name)
            .collect();

        Ok(model_names)
    }

    pub async fn has_model(&self, name: &str) -> Result<bool, OllamaError> {
        let models = self.list_models().await?;
        Ok(models.iter().any(|m| m == name))
    }
}

#[async_trait]
impl ChatBackend for OllamaClient {
    async fn chat(&self, model: &str, messages: &[ChatTurn]) -> anyhow::Result<String> {
        Ok(OllamaClient::chat(self, model, messages).await?)
    }

    async fn list_models(&self) -> anyhow::Result<Vec<String>> {
        Ok(OllamaClient::list_models(self).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::ChatRole;

    #[test]
    fn test_chat_request_wire_format() {
        let turns = vec![
            ChatTurn::new(ChatRole::System, "be nice"),
            ChatTurn::new(ChatRole::User, "hi"),
        ];
        let request = OllamaChatRequest {
            model: "gemma3:1b",
            messages: &turns,
            stream: false,
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["model"], "gemma3:1b");
        assert_eq!(value["stream"], false);
        assert_eq!(value["messages"][0]["role"], "system");
        assert_eq!(value["messages"][1]["content"], "hi");
    }

    #[test]
    fn test_chat_response_parses_message() {
        let body = r#"{"model":"gemma3:1b","message":{"role":"assistant","content":"Hello!"},"done":true}"#;
        let parsed: OllamaChatResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.message.unwrap().content, "Hello!");
        assert!(parsed.error.is_none());
    }

    #[test]
    fn test_trailing_slash_is_trimmed() {
        let client = OllamaClient::new("http://localhost:11434/");
        assert_eq!(client.base_url(), DEFAULT_OLLAMA_URL);
    }

    #[tokio::test]
    async fn test_unreachable_server_is_an_error() {
        // Port 9 (discard) is not an Ollama server
        let client = OllamaClient::new("http://127.0.0.1:9");
        let turns = vec![ChatTurn::new(ChatRole::User, "hi")];
        assert!(client.chat("gemma3:1b", &turns).await.is_err());
        assert!(matches!(
            client.has_model("gemma3:1b").await,
            Err(OllamaError::ServerNotRunning(_))
        ));
    }
}
