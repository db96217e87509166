//! Data structures for the Gemini AI API requests and responses.

mod content;
mod model_params;
mod part;
mod request;
mod response;
mod safety;

pub use content::{Content, Role};
pub use model_params::GenerationConfig;
pub use part::{InlineData, Part};
pub use request::Request;
pub use response::{
    Candidate, FinishReason, PromptFeedback, Response, SafetyRating, UsageMetadata,
};
pub use safety::{HarmCategory, SafetyProbability};
