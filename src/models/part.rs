//! Message content parts, shared by requests, responses and the local conversation.

use serde::{Deserialize, Serialize};

/// A single piece of message content: either text or an inline binary payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Part {
    /// A text part containing a string value
    Text {
        /// The text content of the part
        text: String,
        /// Set by thinking models on parts that carry reasoning rather than the answer.
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        thought: bool,
    },
    /// A part containing inline data
    InlineData {
        /// The inline data content of the part
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

/// Binary content carried inline, base64-encoded without a data-URL prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    /// The MIME type of the inline data
    pub mime_type: String,
    /// The base64-encoded payload
    pub data: String,
}

impl Part {
    /// Creates a text part.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text {
            text: text.into(),
            thought: false,
        }
    }

    /// Creates an inline data part from an already base64-encoded payload.
    pub fn inline(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self::InlineData {
            inline_data: InlineData {
                mime_type: mime_type.into(),
                data: data.into(),
            },
        }
    }

    /// Returns the text if this is a text part.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text, .. } => Some(text),
            Self::InlineData { .. } => None,
        }
    }

    /// Returns `true` if this is model reasoning rather than answer text.
    pub fn is_thought(&self) -> bool {
        matches!(self, Self::Text { thought: true, .. })
    }

    /// Returns `true` if this part carries inline binary data.
    pub fn is_inline_data(&self) -> bool {
        matches!(self, Self::InlineData { .. })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn inline_part_uses_wire_field_names() {
        let part = Part::inline("image/png", "aGk=");
        assert_eq!(
            serde_json::to_value(&part).unwrap(),
            json!({ "inlineData": { "mimeType": "image/png", "data": "aGk=" } })
        );
    }

    #[test]
    fn text_part_deserializes_with_extra_fields() {
        let part: Part = serde_json::from_value(json!({ "text": "hi", "thought": false })).unwrap();
        assert_eq!(part.as_text(), Some("hi"));
        assert_eq!(part, Part::text("hi"));
    }

    #[test]
    fn thought_flag_is_read_and_omitted_when_unset() {
        let part: Part = serde_json::from_value(json!({ "text": "hmm", "thought": true })).unwrap();
        assert!(part.is_thought());
        assert!(!Part::text("hi").is_thought());
        assert_eq!(serde_json::to_value(Part::text("hi")).unwrap(), json!({ "text": "hi" }));
    }
}
