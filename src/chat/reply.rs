//! Reduces the outcome of one API call to a displayable reply.

use std::fmt;

use tracing::warn;

use crate::{client::ContentGenerator, conversation::Message, models::Request};

/// Shown when the service answered without any text.
pub const EMPTY_RESPONSE_APOLOGY: &str =
    "I'm sorry, I couldn't generate a response. The response might have been empty or blocked.";

/// The model's answer to one user turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// The model produced text.
    Text(String),
    /// The call succeeded but produced no text.
    Empty,
    /// The call failed with the given message.
    Failed(String),
}

impl Reply {
    /// Returns `true` if the call failed.
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    /// Converts the reply into a model message for the conversation.
    pub fn into_message(self) -> Message {
        Message::model_text(self.to_string())
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::Empty => f.write_str(EMPTY_RESPONSE_APOLOGY),
            Self::Failed(message) => write!(f, "Error: {message}"),
        }
    }
}

/// Performs one call and folds every outcome into a [`Reply`]. Never fails.
pub async fn reply<G>(generator: &G, request: &Request) -> Reply
where
    G: ContentGenerator + ?Sized,
{
    match generator.generate(request).await {
        Ok(response) => match response.text() {
            Some(text) => Reply::Text(text),
            None => {
                warn!(
                    reason = response.block_reason().as_deref().unwrap_or("none"),
                    "model returned no text"
                );
                Reply::Empty
            }
        },
        Err(err) => {
            warn!("error calling the Gemini API: {err}");
            Reply::Failed(err.to_string())
        }
    }
}
