//! Prompt construction and the model call with a single fallback

use std::sync::Arc;
use tracing::{info, warn};

use crate::ai::{ChatBackend, ChatTurn};
use crate::state::{Action, ChatMessage, ChatRole, Preferences, Tone};

pub const ASSISTANT_NAME: &str = "Bali.AI";
pub const DEFAULT_MODEL: &str = "gemma3:1b";
pub const FALLBACK_MODEL: &str = "gemma2:2b";

/// Number of prior chat messages forwarded with each request. The window
/// excludes the current question, which is sent once as the final prompt.
pub const HISTORY_WINDOW: usize = 5;

const CAPABILITIES_PROMPT: &str = "Describe your capabilities and limitations in simple Markdown format (e.g., use **bold**, *italic*, - lists).";

/// Static capabilities text shown in the about popup
pub const CAPABILITIES: &str = "\
### Bali.AI Capabilities
- **Conversational Chat**: Have natural, friendly conversations, remembering up to 5 previous messages.
- **Summarization**: Condense long texts into short summaries, great for articles or notes.
- **Task Management**: Add, view, and remove tasks in a to-do list, saved locally.
- **Reminders**: Set time-based reminders for events or tasks, stored persistently.
- **Personalization**: Customize responses with your name and tone (Friendly, Formal, Casual).
- **Local Processing**: Runs on your device with `gemma3:1b` or `gemma2:2b`, ensuring privacy.

### Limitations
- **No Real-Time Web Access**: Responses use model data (up to March 2025), no live internet.
- **Resource Constraints**: Limited by ~4GB RAM; complex tasks may be slow.
- **Text-Only**: Cannot process images, audio, or other non-text inputs.
- **No Professional Advice**: Not qualified for medical, legal, or financial advice. Consult professionals.
- **Emotional Understanding**: Can interpret emotional language but lacks true empathy.
- **Model Dependency**: Requires Ollama and `gemma3:1b` or `gemma2:2b`.";

/// Greeting for the given hour of the day (0-23)
pub fn greeting(hour: u32) -> &'static str {
    if hour < 12 {
        "Good morning"
    } else if hour < 17 {
        "Good afternoon"
    } else {
        "Good evening"
    }
}

/// Turn the submitted text into the prompt actually sent to the model
pub fn prepare_prompt(question: &str, action: Action) -> String {
    match action {
        Action::Summarize => format!("Summarize this text: {}", question),
        Action::Ask => {
            let lower = question.to_lowercase();
            if lower.starts_with("what can you do") || lower.starts_with("capabilities") {
                CAPABILITIES_PROMPT.to_string()
            } else {
                question.to_string()
            }
        }
    }
}

pub fn system_prompt(user_name: Option<&str>, tone: Tone) -> String {
    format!(
        "You are {}, a personal assistant for {}. Use a {} tone and respond in English. \
         Provide concise, accurate responses in simple Markdown format (e.g., use **bold**, *italic*, - lists). \
         Answer as a helpful assistant.",
        ASSISTANT_NAME,
        user_name.filter(|n| !n.is_empty()).unwrap_or("User"),
        tone.as_str()
    )
}

/// Chat client that tries the primary model, then the fallback model
#[derive(Clone)]
pub struct Assistant {
    backend: Arc<dyn ChatBackend>,
    model: String,
    fallback_model: String,
    user_name: Option<String>,
    preferences: Preferences,
}

impl Assistant {
    pub fn new(backend: Arc<dyn ChatBackend>) -> Self {
        Self {
            backend,
            model: DEFAULT_MODEL.to_string(),
            fallback_model: FALLBACK_MODEL.to_string(),
            user_name: None,
            preferences: Preferences::default(),
        }
    }

    pub fn with_models(mut self, model: impl Into<String>, fallback_model: impl Into<String>) -> Self {
        self.model = model.into();
        self.fallback_model = fallback_model.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn fallback_model(&self) -> &str {
        &self.fallback_model
    }

    pub fn set_model(&mut self, model: impl Into<String>) {
        self.model = model.into();
    }

    pub fn user_name(&self) -> Option<&str> {
        self.user_name.as_deref()
    }

    pub fn set_user_name(&mut self, name: impl Into<String>) {
        self.user_name = Some(name.into());
    }

    pub fn tone(&self) -> Tone {
        self.preferences.tone
    }

    pub fn set_tone(&mut self, tone: Tone) {
        self.preferences.tone = tone;
    }

    pub fn backend(&self) -> Arc<dyn ChatBackend> {
        Arc::clone(&self.backend)
    }

    /// System prompt, the last few prior messages, then the new prompt
    pub fn build_messages(&self, history: &[ChatMessage], prompt: &str) -> Vec<ChatTurn> {
        let start = history.len().saturating_sub(HISTORY_WINDOW);

        let mut messages = Vec::with_capacity(HISTORY_WINDOW + 2);
        messages.push(ChatTurn::new(
            ChatRole::System,
            system_prompt(self.user_name(), self.tone()),
        ));
        messages.extend(history[start..].iter().map(ChatTurn::from));
        messages.push(ChatTurn::new(ChatRole::User, prompt));
        messages
    }

    /// Ask the model. Never fails: total failure becomes an error message.
    pub async fn respond(&self, history: &[ChatMessage], prompt: &str) -> String {
        let messages = self.build_messages(history, prompt);

        let primary_err = match self.backend.chat(&self.model, &messages).await {
            Ok(reply) => return reply.trim().to_string(),
            Err(e) => e,
        };
        warn!(model = %self.model, error = %primary_err, "primary model failed, trying fallback");

        match self.backend.chat(&self.fallback_model, &messages).await {
            Ok(reply) => {
                info!(model = %self.fallback_model, "fallback model answered");
                reply.trim().to_string()
            }
            Err(e) => {
                warn!(model = %self.fallback_model, error = %e, "fallback model failed");
                format!(
                    "⚠️ Error: Could not connect to any model. Please check if Ollama is running. ({})",
                    primary_err
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Backend that answers only for the listed models and records calls
    struct ScriptedBackend {
        working: Vec<&'static str>,
        calls: Mutex<Vec<(String, Vec<ChatTurn>)>>,
    }

    impl ScriptedBackend {
        fn new(working: Vec<&'static str>) -> Arc<Self> {
            Arc::new(Self {
                working,
                calls: Mutex::new(Vec::new()),
            })
        }

        fn called_models(&self) -> Vec<String> {
            self.calls.lock().unwrap().iter().map(|(m, _)| m.clone()).collect()
        }
    }

    #[async_trait]
    impl ChatBackend for ScriptedBackend {
        async fn chat(&self, model: &str, messages: &[ChatTurn]) -> anyhow::Result<String> {
            self.calls
                .lock()
                .unwrap()
                .push((model.to_string(), messages.to_vec()));
            if self.working.iter().any(|m| *m == model) {
                Ok(format!("  reply from {}\n", model))
            } else {
                Err(anyhow!("model {} unavailable", model))
            }
        }

        async fn list_models(&self) -> anyhow::Result<Vec<String>> {
            Ok(self.working.iter().map(|m| m.to_string()).collect())
        }
    }

    fn history(n: usize) -> Vec<ChatMessage> {
        (0..n)
            .map(|i| {
                let role = if i % 2 == 0 { ChatRole::User } else { ChatRole::Assistant };
                ChatMessage::new(role, format!("message {}", i), "2025-01-01 00:00:00")
            })
            .collect()
    }

    #[tokio::test]
    async fn test_primary_model_answers() {
        let backend = ScriptedBackend::new(vec![DEFAULT_MODEL, FALLBACK_MODEL]);
        let assistant = Assistant::new(backend.clone());

        let reply = assistant.respond(&[], "hello").await;
        assert_eq!(reply, "reply from gemma3:1b");
        assert_eq!(backend.called_models(), vec![DEFAULT_MODEL.to_string()]);
    }

    #[tokio::test]
    async fn test_falls_back_when_primary_fails() {
        let backend = ScriptedBackend::new(vec![FALLBACK_MODEL]);
        let assistant = Assistant::new(backend.clone());

        let reply = assistant.respond(&history(2), "hello").await;
        assert_eq!(reply, "reply from gemma2:2b");
        assert_eq!(
            backend.called_models(),
            vec![DEFAULT_MODEL.to_string(), FALLBACK_MODEL.to_string()]
        );

        let calls = backend.calls.lock().unwrap();
        assert_eq!(calls[0].1, calls[1].1);
    }

    #[tokio::test]
    async fn test_total_failure_is_an_error_string() {
        let backend = ScriptedBackend::new(vec![]);
        let assistant = Assistant::new(backend);

        let reply = assistant.respond(&[], "hello").await;
        assert!(reply.starts_with("⚠️ Error: Could not connect to any model."));
        assert!(reply.contains("model gemma3:1b unavailable"));
    }

    #[test]
    fn test_only_recent_history_is_forwarded() {
        let assistant = Assistant::new(ScriptedBackend::new(vec![]));
        let messages = assistant.build_messages(&history(8), "latest");

        assert_eq!(messages.len(), HISTORY_WINDOW + 2);
        assert_eq!(messages[0].role, ChatRole::System);
        assert_eq!(messages[1].content, "message 3");
        assert_eq!(messages[5].content, "message 7");
        assert_eq!(messages[6], ChatTurn::new(ChatRole::User, "latest"));
    }

    #[test]
    fn test_short_history_is_forwarded_whole() {
        let assistant = Assistant::new(ScriptedBackend::new(vec![]));
        let messages = assistant.build_messages(&history(2), "q");
        assert_eq!(messages.len(), 4);
    }

    #[test]
    fn test_system_prompt_uses_name_and_tone() {
        let mut assistant = Assistant::new(ScriptedBackend::new(vec![]));
        let default = assistant.build_messages(&[], "q");
        assert!(default[0].content.contains("personal assistant for User."));
        assert!(default[0].content.contains("Use a Friendly tone"));

        assistant.set_user_name("Ana");
        assistant.set_tone(Tone::Formal);
        let custom = assistant.build_messages(&[], "q");
        assert!(custom[0].content.contains("personal assistant for Ana."));
        assert!(custom[0].content.contains("Use a Formal tone"));
    }

    #[test]
    fn test_prepare_prompt() {
        assert_eq!(
            prepare_prompt("long article", Action::Summarize),
            "Summarize this text: long article"
        );
        assert_eq!(prepare_prompt("What can you do?", Action::Ask), CAPABILITIES_PROMPT);
        assert_eq!(prepare_prompt("Capabilities please", Action::Ask), CAPABILITIES_PROMPT);
        assert_eq!(prepare_prompt("tell me a joke", Action::Ask), "tell me a joke");
        assert_eq!(
            prepare_prompt("what can you do", Action::Summarize),
            "Summarize this text: what can you do"
        );
    }

    #[test]
    fn test_capabilities_lists_limitations() {
        assert!(CAPABILITIES.contains("up to March 2025"));
        assert!(CAPABILITIES.contains("Limited by ~4GB RAM"));
    }

    #[test]
    fn test_greeting_boundaries() {
        assert_eq!(greeting(0), "Good morning");
        assert_eq!(greeting(11), "Good morning");
        assert_eq!(greeting(12), "Good afternoon");
        assert_eq!(greeting(16), "Good afternoon");
        assert_eq!(greeting(17), "Good evening");
        assert_eq!(greeting(23), "Good evening");
    }
}
