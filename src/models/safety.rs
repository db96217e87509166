//! Safety categories and probabilities reported with responses.

use serde::{Deserialize, Serialize};

/// Safety category reported by the Gemini AI API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HarmCategory {
    /// Content that harasses, bullies, or threatens individuals or groups.
    HarmCategoryHarassment,
    /// Content that expresses hateful, biased, or discriminatory views.
    HarmCategoryHateSpeech,
    /// Content of a sexual nature or containing explicit material.
    HarmCategorySexuallyExplicit,
    /// Content that promotes or provides instructions for dangerous activities.
    HarmCategoryDangerousContent,
    /// Content that may undermine or manipulate civic processes and institutions.
    HarmCategoryCivicIntegrity,
    /// A category this client does not know about.
    #[serde(other)]
    Unknown,
}

/// Probability level for safety ratings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SafetyProbability {
    /// Negligible probability of harmful content.
    Negligible,
    /// Low probability of harmful content.
    Low,
    /// Medium probability of harmful content.
    Medium,
    /// High probability of harmful content.
    High,
    /// A level this client does not know about.
    #[serde(other)]
    Unknown,
}
