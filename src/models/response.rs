//! Response models for the Gemini AI API.

use serde::Deserialize;

use super::{Content, HarmCategory, Part, SafetyProbability};

/// A response from the `generateContent` endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    /// The generated candidates from the model.
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    /// Feedback on the prompt, present when it was blocked.
    pub prompt_feedback: Option<PromptFeedback>,
    /// Metadata about token usage.
    pub usage_metadata: Option<UsageMetadata>,
    /// The version of the model used.
    pub model_version: Option<String>,
}

impl Response {
    /// Concatenates the answer text of the first candidate, skipping
    /// reasoning parts marked as thoughts.
    ///
    /// Returns `None` when there is no candidate or the candidate carries no
    /// non-empty text, e.g. because the output was blocked.
    pub fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text = content
            .parts
            .iter()
            .filter(|part| !part.is_thought())
            .filter_map(Part::as_text)
            .collect::<String>();
        (!text.is_empty()).then_some(text)
    }

    /// The reason generation stopped early, if the service reported one.
    pub fn block_reason(&self) -> Option<String> {
        if let Some(reason) = self
            .prompt_feedback
            .as_ref()
            .and_then(|feedback| feedback.block_reason.clone())
        {
            return Some(reason);
        }
        match self.candidates.first()?.finish_reason.as_ref()? {
            FinishReason::Stop | FinishReason::MaxTokens => None,
            other => Some(format!("{other:?}")),
        }
    }
}

/// A candidate response from the model.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    /// The content of the candidate response; absent when blocked.
    pub content: Option<Content>,
    /// The reason why the generation finished.
    pub finish_reason: Option<FinishReason>,
    /// Safety ratings for different harm categories.
    pub safety_ratings: Option<Vec<SafetyRating>>,
}

/// Safety rating for a specific harm category.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SafetyRating {
    /// The category of harm being rated.
    pub category: HarmCategory,
    /// The probability level of harmful content.
    pub probability: SafetyProbability,
}

/// Feedback about the prompt itself.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    /// Why the prompt was blocked, if it was.
    pub block_reason: Option<String>,
    /// Safety ratings of the prompt.
    pub safety_ratings: Option<Vec<SafetyRating>>,
}

/// Reason why the generation finished.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FinishReason {
    #[serde(rename = "FINISH_REASON_UNSPECIFIED")]
    /// Default value. This value is unused.
    Unspecified,
    /// Natural stop point of the model or provided stop sequence.
    Stop,
    /// The maximum number of tokens as specified in the request was reached.
    MaxTokens,
    /// The response candidate content was flagged for safety reasons.
    Safety,
    /// The response candidate content was flagged for recitation reasons.
    Recitation,
    /// The response candidate content was flagged for using an unsupported language.
    Language,
    /// Token generation stopped because the content contains forbidden terms.
    Blocklist,
    /// Token generation stopped for potentially containing prohibited content.
    ProhibitedContent,
    /// Token generation stopped because the content potentially contains Sensitive Personally Identifiable Information (SPII).
    Spii,
    /// Unknown reason.
    #[serde(other)]
    Other,
}

/// Metadata about token usage in the request and response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetadata {
    /// Number of tokens in the prompt.
    pub prompt_token_count: Option<i32>,
    /// Number of tokens in the generated candidates.
    pub candidates_token_count: Option<i32>,
    /// Total number of tokens used.
    pub total_token_count: Option<i32>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn joins_text_parts_of_first_candidate() {
        let response: Response = serde_json::from_value(json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": "Hello, " }, { "text": "world" }] },
                "finishReason": "STOP"
            }],
            "usageMetadata": { "promptTokenCount": 3, "totalTokenCount": 5 },
            "modelVersion": "gemini-2.5-pro"
        }))
        .unwrap();

        assert_eq!(response.text().as_deref(), Some("Hello, world"));
        assert_eq!(response.block_reason(), None);
    }

    #[test]
    fn thought_parts_are_not_part_of_the_answer() {
        let response: Response = serde_json::from_value(json!({
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [{ "text": "SECRET REASONING", "thought": true }, { "text": "answer" }]
                }
            }]
        }))
        .unwrap();

        assert_eq!(response.text().as_deref(), Some("answer"));
    }

    #[test]
    fn only_thoughts_means_no_text() {
        let response: Response = serde_json::from_value(json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": "thinking", "thought": true }] }
            }]
        }))
        .unwrap();

        assert!(response.text().is_none());
    }

    #[test]
    fn blocked_prompt_has_no_text() {
        let response: Response = serde_json::from_value(json!({
            "promptFeedback": { "blockReason": "SAFETY" }
        }))
        .unwrap();

        assert!(response.text().is_none());
        assert_eq!(response.block_reason().as_deref(), Some("SAFETY"));
    }

    #[test]
    fn unknown_finish_reason_is_tolerated() {
        let response: Response = serde_json::from_value(json!({
            "candidates": [{ "finishReason": "SOMETHING_NEW" }]
        }))
        .unwrap();

        assert!(response.text().is_none());
        assert_eq!(response.block_reason().as_deref(), Some("Other"));
    }
}
