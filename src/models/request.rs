//! Request models for the Gemini AI API.

use serde::Serialize;

use super::{Content, GenerationConfig};

/// A `generateContent` request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    /// System instruction for the model, sent alongside the history.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<Content>,
    /// The conversation to continue, oldest turn first.
    pub contents: Vec<Content>,
    /// Optional sampling parameters.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
}

impl Request {
    /// Creates a request for the given turns without a system instruction.
    pub fn new(contents: Vec<Content>) -> Self {
        Self {
            system_instruction: None,
            contents,
            generation_config: None,
        }
    }

    /// Attaches a system instruction to the request.
    pub fn with_system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = Some(Content::instruction(instruction));
        self
    }

    /// Attaches sampling parameters; an empty config is left out of the payload.
    pub fn with_generation_config(mut self, config: GenerationConfig) -> Self {
        self.generation_config = (!config.is_empty()).then_some(config);
        self
    }
}
