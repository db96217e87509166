//! Turns the conversation and a new user turn into a request.

use tracing::debug;

use crate::{
    attachment::Attachment,
    config::ChatConfig,
    conversation::Conversation,
    models::{Content, GenerationConfig, Part, Request, Role},
};

/// Builds the parts of a new user turn.
///
/// The image comes first, then the trimmed text. Returns `None` when there is
/// neither, in which case nothing must be sent.
pub fn compose_user_parts(text: &str, attachment: Option<&Attachment>) -> Option<Vec<Part>> {
    let mut parts = Vec::with_capacity(2);
    if let Some(attachment) = attachment {
        parts.push(attachment.to_part());
    }
    let text = text.trim();
    if !text.is_empty() {
        parts.push(Part::text(text));
    }
    (!parts.is_empty()).then_some(parts)
}

/// Builds `generateContent` requests with a fixed system instruction.
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    system_instruction: String,
    generation_config: GenerationConfig,
}

impl RequestBuilder {
    /// Creates a builder sending `system_instruction` with every request.
    pub fn new(system_instruction: impl Into<String>) -> Self {
        Self {
            system_instruction: system_instruction.into(),
            generation_config: GenerationConfig::default(),
        }
    }

    /// Creates a builder from the instruction and sampling settings in `config`.
    pub fn from_config(config: &ChatConfig) -> Self {
        Self::new(config.system_instruction()).with_generation_config(config.generation.clone())
    }

    /// Sets the sampling parameters sent with every request.
    pub fn with_generation_config(mut self, generation_config: GenerationConfig) -> Self {
        self.generation_config = generation_config;
        self
    }

    /// The system instruction sent with every request.
    pub fn system_instruction(&self) -> &str {
        &self.system_instruction
    }

    /// Builds the request for `new_parts` following `history`.
    ///
    /// The greeting at the head of `history` is dropped; every other message is
    /// replayed as-is, in order, whatever its role.
    pub fn build(&self, history: &Conversation, new_parts: Vec<Part>) -> Request {
        let mut contents: Vec<Content> = history.replayable().iter().map(Content::from).collect();
        contents.push(Content::new(Role::User, new_parts));
        debug!(turns = contents.len(), "built request");

        Request::new(contents)
            .with_system_instruction(self.system_instruction.as_str())
            .with_generation_config(self.generation_config.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        attachment::AttachmentPolicy,
        conversation::{Message, DEFAULT_GREETING},
    };

    fn image() -> Attachment {
        Attachment::from_bytes("cat.png", "image/png", b"meow", &AttachmentPolicy::default())
            .unwrap()
    }

    #[test]
    fn image_part_precedes_trimmed_text() {
        let parts = compose_user_parts("  what is this?\n", Some(&image())).unwrap();
        assert_eq!(parts.len(), 2);
        assert!(parts[0].is_inline_data());
        assert_eq!(parts[1].as_text(), Some("what is this?"));
    }

    #[test]
    fn blank_text_without_image_composes_nothing() {
        assert_eq!(compose_user_parts("   \t", None), None);
        assert_eq!(compose_user_parts("", None), None);
        assert_eq!(compose_user_parts("", Some(&image())).map(|p| p.len()), Some(1));
    }

    #[test]
    fn drops_greeting_and_appends_new_turn() {
        let mut history = Conversation::default();
        for turn in 0..3 {
            history.append(Message::user(vec![Part::text(format!("q{turn}"))]));
            history.append(Message::model_text(format!("a{turn}")));
        }

        let request = RequestBuilder::new("persona").build(&history, vec![Part::text("next")]);

        assert_eq!(request.contents.len(), history.len() - 1 + 1);
        assert_eq!(request.contents[0].parts[0].as_text(), Some("q0"));
        assert_eq!(request.contents.last().unwrap().role, Some(Role::User));
        assert!(request
            .contents
            .iter()
            .flat_map(|content| &content.parts)
            .all(|part| part.as_text() != Some(DEFAULT_GREETING)));
        assert_eq!(
            request.system_instruction,
            Some(Content::instruction("persona"))
        );
    }

    #[test]
    fn tolerates_any_role_order() {
        let history = Conversation::from(vec![
            Message::model_text("greeting"),
            Message::model_text("m1"),
            Message::model_text("m2"),
            Message::user(vec![Part::text("u1")]),
            Message::user(vec![Part::text("u2")]),
        ]);

        let request = RequestBuilder::new("persona").build(&history, vec![Part::text("u3")]);

        let roles: Vec<_> = request.contents.iter().map(|c| c.role).collect();
        assert_eq!(
            roles,
            [Role::Model, Role::Model, Role::User, Role::User, Role::User].map(Some)
        );
    }

    #[test]
    fn greeting_only_history_sends_single_turn() {
        let request =
            RequestBuilder::new("persona").build(&Conversation::default(), vec![Part::text("hi")]);
        assert_eq!(request.contents.len(), 1);
    }
}
