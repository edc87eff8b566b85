pub mod ai;
pub mod assistant;
pub mod config;
pub mod state;
pub mod store;

// Re-export main types for convenience
pub use ai::{ChatBackend, ChatTurn, OllamaClient, OllamaError};
pub use assistant::{greeting, prepare_prompt, Assistant, CAPABILITIES};
pub use config::Config;
pub use state::{Action, ChatMessage, ChatRole, Preferences, Tone};
pub use store::{AssistantData, DataStore, Reminder};
