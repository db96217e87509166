//! Error types for the chat client.

use thiserror::Error;

use crate::attachment::AttachmentError;

/// Errors that can occur when using the chat client.
#[derive(Debug, Error)]
pub enum ChatError {
    /// Base error for the chat client.
    #[error("{message}")]
    Base {
        /// Error message
        message: String,
    },

    /// No API key was found in any configuration source.
    #[error("API key not found. Set the API_KEY environment variable or add `api_key` to the config file")]
    MissingApiKey,

    /// Error occurred during an API request.
    #[error("API request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    /// Error occurred when parsing JSON.
    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Error occurred while loading the configuration.
    #[error("Configuration error: {0}")]
    Config(#[from] Box<figment::Error>),

    /// The selected file could not be turned into an attachment.
    #[error(transparent)]
    Attachment(#[from] AttachmentError),

    /// Terminal or filesystem I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ChatError {
    /// Creates a new Base error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self::Base {
            message: message.into(),
        }
    }
}

impl From<figment::Error> for ChatError {
    fn from(err: figment::Error) -> Self {
        Self::Config(Box::new(err))
    }
}
