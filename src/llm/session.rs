//! Persisted chat conversations.
//!
//! A prompt is answered in two halves: [`ChatSession::begin`] records the user
//! message and hands out a [`RequestToken`], and [`ChatSession::complete`]
//! attaches the reply only if that token is still current. Switching or
//! starting a conversation in between invalidates outstanding tokens, so a
//! late reply is dropped instead of landing in the wrong conversation.

use std::sync::Arc;
use tokio::task::JoinHandle;

use super::assistant::{Assistant, APOLOGY};
use crate::models::{ChatMessage, Conversation, Sender};
use crate::store::{keys, load_json, save_json, KeyValueStore, StoreResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestToken {
    conversation_id: String,
    generation: u64,
}

impl RequestToken {
    pub fn conversation_id(&self) -> &str {
        &self.conversation_id
    }
}

pub struct ChatSession {
    store: Arc<dyn KeyValueStore>,
    /// Most recent first.
    conversations: Vec<Conversation>,
    active: Option<String>,
    generation: u64,
}

impl ChatSession {
    /// Rehydrate history. An unreadable blob starts empty.
    pub fn load(store: Arc<dyn KeyValueStore>) -> StoreResult<Self> {
        let conversations: Vec<Conversation> =
            load_json(store.as_ref(), keys::CHAT_HISTORY)?.unwrap_or_default();
        Ok(Self {
            store,
            conversations,
            active: None,
            generation: 0,
        })
    }

    pub fn conversations(&self) -> &[Conversation] {
        &self.conversations
    }

    pub fn active(&self) -> Option<&Conversation> {
        let id = self.active.as_deref()?;
        self.conversations.iter().find(|c| c.id == id)
    }

    fn persist(&self) -> StoreResult<()> {
        save_json(self.store.as_ref(), keys::CHAT_HISTORY, &self.conversations)
    }

    fn switch_to(&mut self, id: Option<String>) {
        if self.active != id {
            self.active = id;
            self.generation += 1;
        }
    }

    /// Start an empty conversation and make it active.
    pub fn new_conversation(&mut self) -> StoreResult<&Conversation> {
        let conversation = Conversation::new();
        let id = conversation.id.clone();
        self.conversations.insert(0, conversation);
        self.persist()?;
        self.switch_to(Some(id));
        tracing::debug!(generation = self.generation, "Started conversation");
        Ok(&self.conversations[0])
    }

    /// Make an existing conversation active. Returns false for unknown ids.
    pub fn select(&mut self, id: &str) -> bool {
        if !self.conversations.iter().any(|c| c.id == id) {
            return false;
        }
        self.switch_to(Some(id.to_string()));
        true
    }

    pub fn delete_conversation(&mut self, id: &str) -> StoreResult<bool> {
        let before = self.conversations.len();
        self.conversations.retain(|c| c.id != id);
        if self.conversations.len() == before {
            return Ok(false);
        }
        self.persist()?;
        if self.active.as_deref() == Some(id) {
            self.switch_to(None);
        }
        Ok(true)
    }

    /// Record a user prompt in the active conversation, starting one if
    /// needed. Blank prompts are ignored.
    pub fn begin(&mut self, prompt: &str) -> StoreResult<Option<RequestToken>> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Ok(None);
        }
        if self.active().is_none() {
            self.new_conversation()?;
        }

        let generation = self.generation;
        let Some(conversation) = self.active_mut() else {
            return Ok(None);
        };
        conversation.push(ChatMessage::new(Sender::User, prompt));
        let token = RequestToken {
            conversation_id: conversation.id.clone(),
            generation,
        };
        self.persist()?;
        Ok(Some(token))
    }

    fn active_mut(&mut self) -> Option<&mut Conversation> {
        let id = self.active.clone()?;
        self.conversations.iter_mut().find(|c| c.id == id)
    }

    pub fn is_current(&self, token: &RequestToken) -> bool {
        token.generation == self.generation && self.active.as_deref() == Some(token.conversation_id.as_str())
    }

    /// Attach a reply. Returns false when the token went stale and the
    /// reply was dropped.
    pub fn complete(&mut self, token: &RequestToken, reply: impl Into<String>) -> StoreResult<bool> {
        if !self.is_current(token) {
            tracing::info!(
                conversation = %token.conversation_id,
                "Discarding reply for a conversation that is no longer active"
            );
            return Ok(false);
        }
        let Some(conversation) = self.active_mut() else {
            return Ok(false);
        };
        conversation.push(ChatMessage::new(Sender::Ai, reply));
        self.persist()?;
        Ok(true)
    }

    /// Record the prompt and start the assistant on a blocking thread. The
    /// session stays free while the reply is pending, so the caller may
    /// switch conversations before handing the reply to [`Self::complete`].
    pub fn dispatch(&mut self, assistant: Arc<Assistant>, prompt: &str) -> StoreResult<Option<PendingReply>> {
        let Some(token) = self.begin(prompt)? else {
            return Ok(None);
        };

        let prompt = prompt.trim().to_string();
        let handle = tokio::task::spawn_blocking(move || assistant.chat(&prompt));
        tracing::debug!(conversation = %token.conversation_id, generation = token.generation, "Chat request dispatched");
        Ok(Some(PendingReply { token, handle }))
    }

    /// Dispatch, wait and record in one go.
    pub async fn send(&mut self, assistant: Arc<Assistant>, prompt: &str) -> StoreResult<Option<ChatMessage>> {
        let Some(pending) = self.dispatch(assistant, prompt)? else {
            return Ok(None);
        };
        let (token, reply) = pending.wait().await;

        if !self.complete(&token, reply)? {
            return Ok(None);
        }
        Ok(self.active().and_then(|c| c.messages.last().cloned()))
    }
}

/// An answer still being produced, with the token it must be filed under.
pub struct PendingReply {
    token: RequestToken,
    handle: JoinHandle<String>,
}

impl PendingReply {
    pub fn token(&self) -> &RequestToken {
        &self.token
    }

    /// Wait for the assistant. A crashed task yields the apology.
    pub async fn wait(self) -> (RequestToken, String) {
        let reply = self.handle.await.unwrap_or_else(|e| {
            tracing::error!(error = %e, "Chat task failed");
            APOLOGY.to_string()
        });
        (self.token, reply)
    }
}
