//! UI-agnostic session state types
//!
//! These types are shared between the assistant logic and any front end
//! and don't depend on a specific UI framework.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// Format used for chat message timestamps
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A chat message in the current session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
    pub timestamp: String,
}

impl ChatMessage {
    pub fn new(role: ChatRole, content: impl Into<String>, timestamp: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: timestamp.into(),
        }
    }
}

/// The role of a chat message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

impl ChatRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatRole::System => "system",
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
        }
    }

    /// Capitalized label used when rendering a message header
    pub fn label(&self) -> &'static str {
        match self {
            ChatRole::System => "System",
            ChatRole::User => "User",
            ChatRole::Assistant => "Assistant",
        }
    }
}

/// Response tone applied through the system prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Tone {
    #[default]
    Friendly,
    Formal,
    Casual,
}

impl Tone {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tone::Friendly => "Friendly",
            Tone::Formal => "Formal",
            Tone::Casual => "Casual",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "friendly" => Some(Tone::Friendly),
            "formal" => Some(Tone::Formal),
            "casual" => Some(Tone::Casual),
            _ => None,
        }
    }

    pub fn all() -> Vec<Tone> {
        vec![Tone::Friendly, Tone::Formal, Tone::Casual]
    }

    pub fn next(&self) -> Tone {
        match self {
            Tone::Friendly => Tone::Formal,
            Tone::Formal => Tone::Casual,
            Tone::Casual => Tone::Friendly,
        }
    }
}

/// Session preferences, never persisted to the data file
#[derive(Debug, Clone, Default)]
pub struct Preferences {
    pub tone: Tone,
}

/// What to do with the submitted text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Action {
    #[default]
    Ask,
    Summarize,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Ask => "Ask",
            Action::Summarize => "Summarize",
        }
    }

    pub fn toggle(&self) -> Action {
        match self {
            Action::Ask => Action::Summarize,
            Action::Summarize => Action::Ask,
        }
    }
}

/// Current local time formatted for chat messages
pub fn now_timestamp() -> String {
    format_timestamp(&Local::now())
}

pub fn format_timestamp(time: &DateTime<Local>) -> String {
    time.format(TIMESTAMP_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_tone_cycles_through_all() {
        let mut tone = Tone::default();
        let mut seen = Vec::new();
        for _ in 0..3 {
            seen.push(tone);
            tone = tone.next();
        }
        assert_eq!(seen, Tone::all());
        assert_eq!(tone, Tone::Friendly);
    }

    #[test]
    fn test_tone_from_str_is_case_insensitive() {
        assert_eq!(Tone::from_str("FORMAL"), Some(Tone::Formal));
        assert_eq!(Tone::from_str("casual"), Some(Tone::Casual));
        assert_eq!(Tone::from_str("grumpy"), None);
    }

    #[test]
    fn test_role_serializes_lowercase() {
        let json = serde_json::to_string(&ChatRole::Assistant).unwrap();
        assert_eq!(json, "\"assistant\"");
    }

    #[test]
    fn test_format_timestamp() {
        let time = Local.with_ymd_and_hms(2025, 7, 4, 14, 5, 9).unwrap();
        assert_eq!(format_timestamp(&time), "2025-07-04 14:05:09");
    }
}
