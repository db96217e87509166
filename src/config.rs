//! Process-wide configuration, resolved once at startup.
//!
//! Sources, lowest priority first: built-in defaults, the JSON file at
//! `~/.multimodal-main/config.json`, `MULTIMODAL_*` environment variables,
//! and finally the bare `GEMINI_API_KEY` / `API_KEY` variables.

use std::fmt;
use std::path::PathBuf;

use figment::{
    providers::{Env, Format, Json},
    Figment,
};
use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::{attachment::AttachmentPolicy, error::ChatError, models::GenerationConfig};

/// Default model identifier.
pub const DEFAULT_MODEL: &str = "gemini-2.5-pro";
/// Default API endpoint for Google's Generative AI service
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
/// Default API version
pub const DEFAULT_API_VERSION: &str = "v1beta";
/// Language the assistant answers in unless configured otherwise.
pub const DEFAULT_RESPONSE_LANGUAGE: &str = "Russian";
/// Largest attachment accepted by default: 20 MiB, the inline request limit of the API.
pub const DEFAULT_MAX_ATTACHMENT_BYTES: u64 = 20 * 1024 * 1024;

const CONFIG_DIR: &str = ".multimodal-main";
const CONFIG_FILE: &str = "config.json";
const ENV_PREFIX: &str = "MULTIMODAL_";

/// Configuration of the chat client.
#[derive(Clone, Serialize, Deserialize, TypedBuilder)]
#[builder(doc)]
pub struct ChatConfig {
    /// The API key for authentication
    #[builder(setter(into))]
    #[serde(default)]
    pub api_key: String,
    /// Model identifier (e.g., "gemini-2.5-pro")
    #[builder(setter(into), default = DEFAULT_MODEL.to_string())]
    #[serde(default = "default_model")]
    pub model: String,
    /// Base URL of the API, without the version segment
    #[builder(setter(into), default = DEFAULT_BASE_URL.to_string())]
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// API version path segment
    #[builder(setter(into), default = DEFAULT_API_VERSION.to_string())]
    #[serde(default = "default_api_version")]
    pub api_version: String,
    /// Language the assistant is instructed to respond in
    #[builder(setter(into), default = DEFAULT_RESPONSE_LANGUAGE.to_string())]
    #[serde(default = "default_response_language")]
    pub response_language: String,
    /// Replaces the built-in persona instruction entirely when set
    #[builder(default, setter(strip_option, into))]
    #[serde(default)]
    pub system_instruction: Option<String>,
    /// Maximum size of an image attachment in bytes
    #[builder(default = DEFAULT_MAX_ATTACHMENT_BYTES)]
    #[serde(default = "default_max_attachment_bytes")]
    pub max_attachment_bytes: u64,
    /// Sampling parameters sent with every request
    #[builder(default)]
    #[serde(default)]
    pub generation: GenerationConfig,
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_api_version() -> String {
    DEFAULT_API_VERSION.to_string()
}

fn default_response_language() -> String {
    DEFAULT_RESPONSE_LANGUAGE.to_string()
}

fn default_max_attachment_bytes() -> u64 {
    DEFAULT_MAX_ATTACHMENT_BYTES
}

impl ChatConfig {
    /// The system instruction sent with every request.
    pub fn system_instruction(&self) -> String {
        match &self.system_instruction {
            Some(instruction) => instruction.clone(),
            None => persona_instruction(&self.response_language),
        }
    }

    /// The attachment policy derived from this configuration.
    pub fn attachment_policy(&self) -> AttachmentPolicy {
        AttachmentPolicy::images_up_to(self.max_attachment_bytes)
    }
}

impl fmt::Debug for ChatConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatConfig")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("api_version", &self.api_version)
            .field("response_language", &self.response_language)
            .field("system_instruction", &self.system_instruction)
            .field("max_attachment_bytes", &self.max_attachment_bytes)
            .field("generation", &self.generation)
            .finish()
    }
}

/// Builds the assistant persona, answering in `language`.
pub fn persona_instruction(language: &str) -> String {
    format!(
        "You are Multimodal Main, a helpful AI assistant created by a programmer. \
         You are witty, smart, and an expert in many fields. \
         When asked about your identity or the model you are based on, simply state \
         that you are Multimodal Main, a bot created by a programmer. \
         Respond in {language}."
    )
}

/// Whether the client can talk to the API at all.
#[derive(Debug)]
pub enum ConfigState {
    /// A usable configuration with an API key.
    Configured(ChatConfig),
    /// Chat is blocked until the configuration is fixed.
    NotConfigured {
        /// What is wrong, suitable for display.
        reason: String,
    },
}

impl ConfigState {
    /// Loads `.env`, then resolves the configuration from every source.
    pub fn load() -> Self {
        dotenv::dotenv().ok();
        Self::from_figment(default_figment())
    }

    /// Resolves the configuration from an explicit figment.
    pub fn from_figment(figment: Figment) -> Self {
        match figment.extract::<ChatConfig>() {
            Ok(config) if config.api_key.trim().is_empty() => Self::NotConfigured {
                reason: ChatError::MissingApiKey.to_string(),
            },
            Ok(config) => Self::Configured(config),
            Err(err) => Self::NotConfigured {
                reason: ChatError::from(err).to_string(),
            },
        }
    }

    /// Returns `true` if chat is possible.
    pub fn is_configured(&self) -> bool {
        matches!(self, Self::Configured(_))
    }

    /// Converts the state into the configuration or the blocking error.
    pub fn into_config(self) -> Result<ChatConfig, ChatError> {
        match self {
            Self::Configured(config) => Ok(config),
            Self::NotConfigured { reason } => Err(ChatError::new(reason)),
        }
    }
}

/// The user-level config file location, if a home directory exists.
pub fn config_file_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(CONFIG_DIR).join(CONFIG_FILE))
}

/// The figment combining every configuration source.
pub fn default_figment() -> Figment {
    let mut figment = Figment::new();
    if let Some(path) = config_file_path() {
        figment = figment.merge(Json::file(path));
    }
    figment
        .merge(Env::prefixed(ENV_PREFIX))
        .merge(Env::raw().only(&["gemini_api_key"]).map(|_| "api_key".into()))
        .merge(Env::raw().only(&["api_key"]))
}
