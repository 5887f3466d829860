use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

const TITLE_MAX_CHARS: usize = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Ai,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub sender: Sender,
    pub text: String,
}

impl ChatMessage {
    pub fn new(sender: Sender, text: impl Into<String>) -> Self {
        Self {
            id: next_id("msg"),
            sender,
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
}

impl Conversation {
    pub fn new() -> Self {
        Self {
            id: next_id("conv"),
            title: "New chat".to_string(),
            created_at: Utc::now(),
            messages: Vec::new(),
        }
    }

    /// Append a message; the first user prompt names the conversation.
    pub fn push(&mut self, message: ChatMessage) {
        if message.sender == Sender::User && !self.messages.iter().any(|m| m.sender == Sender::User) {
            self.title = derive_title(&message.text);
        }
        self.messages.push(message);
    }
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

/// Conversation title from the first prompt, truncated on a char boundary.
pub fn derive_title(prompt: &str) -> String {
    let prompt = prompt.trim();
    if prompt.chars().count() <= TITLE_MAX_CHARS {
        return prompt.to_string();
    }
    let truncated: String = prompt.chars().take(TITLE_MAX_CHARS).collect();
    format!("{}...", truncated.trim_end())
}

/// Millisecond timestamp plus a process-wide counter, unique within a run.
fn next_id(prefix: &str) -> String {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let seq = COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("{}-{}-{}", prefix, Utc::now().timestamp_millis(), seq)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_user_prompt_sets_title() {
        let mut conv = Conversation::new();
        conv.push(ChatMessage::new(Sender::User, "What is the Doxology?"));
        conv.push(ChatMessage::new(Sender::Ai, "It is a short hymn of praise."));
        conv.push(ChatMessage::new(Sender::User, "Sing it"));
        assert_eq!(conv.title, "What is the Doxology?");
        assert_eq!(conv.messages.len(), 3);
    }

    #[test]
    fn test_derive_title_truncates_long_prompts() {
        let title = derive_title("Please give me the full lyrics of Amazing Grace in Hiligaynon");
        assert!(title.ends_with("..."));
        assert!(title.chars().count() <= TITLE_MAX_CHARS + 3);
    }

    #[test]
    fn test_message_ids_are_unique() {
        let a = ChatMessage::new(Sender::User, "a");
        let b = ChatMessage::new(Sender::User, "b");
        assert_ne!(a.id, b.id);
    }
}
