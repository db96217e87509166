//! The in-memory conversation: an append-only list of turns.

use crate::models::{Content, Part, Role};

/// Greeting shown as the first model turn of every conversation.
pub const DEFAULT_GREETING: &str = "Привет! Я — Multimodal Main, AI-ассистент, созданный программистом. Чем я могу вам сегодня помочь?";

/// One conversational turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    role: Role,
    parts: Vec<Part>,
}

impl Message {
    /// Creates a message authored by `role`.
    pub fn new(role: Role, parts: Vec<Part>) -> Self {
        Self { role, parts }
    }

    /// Creates a user message.
    pub fn user(parts: Vec<Part>) -> Self {
        Self::new(Role::User, parts)
    }

    /// Creates a model message holding a single text part.
    pub fn model_text(text: impl Into<String>) -> Self {
        Self::new(Role::Model, vec![Part::text(text)])
    }

    /// The author of this turn.
    pub fn role(&self) -> Role {
        self.role
    }

    /// The content of this turn, in order.
    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    /// All text parts joined by newlines.
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(Part::as_text)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl From<&Message> for Content {
    fn from(message: &Message) -> Self {
        Content::new(message.role, message.parts.clone())
    }
}

/// The ordered history of a chat.
///
/// The first message is always the local greeting, which the remote model
/// never produced and must never see.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    /// Starts a conversation with a greeting from the model.
    pub fn new(greeting: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::model_text(greeting)],
        }
    }

    /// Appends a message at the end.
    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Returns a copy of the conversation with `message` appended.
    pub fn appended(&self, message: Message) -> Self {
        let mut next = self.clone();
        next.append(message);
        next
    }

    /// Every message, greeting included.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// The greeting message.
    pub fn greeting(&self) -> Option<&Message> {
        self.messages.first()
    }

    /// The messages that are sent to the model as history.
    pub fn replayable(&self) -> &[Message] {
        self.messages.get(1..).unwrap_or_default()
    }

    /// The most recent message.
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Number of messages, greeting included.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Returns `true` if there are no messages at all.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new(DEFAULT_GREETING)
    }
}

impl From<Vec<Message>> for Conversation {
    fn from(messages: Vec<Message>) -> Self {
        Self { messages }
    }
}
