//! Client implementation for the Gemini AI API.

use async_trait::async_trait;
use tracing::debug;

use crate::{
    config::ChatConfig,
    error::ChatError,
    models::{Request, Response},
};

const GENERATE_CONTENT: &str = "generateContent";

/// Something that can answer a `generateContent` request.
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    /// Performs exactly one request/response exchange.
    async fn generate(&self, request: &Request) -> Result<Response, ChatError>;
}

/// A client for interacting with the Gemini AI API.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    config: ChatConfig,
    client: reqwest::Client,
}

impl GeminiClient {
    /// Creates a client for the given configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::MissingApiKey`] if the configuration has no key.
    pub fn new(config: ChatConfig) -> Result<Self, ChatError> {
        if config.api_key.trim().is_empty() {
            return Err(ChatError::MissingApiKey);
        }
        Ok(Self {
            config,
            client: reqwest::Client::new(),
        })
    }

    /// The configuration this client was built with.
    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    fn build_url(&self) -> String {
        format!(
            "{}/{}/models/{}:{}?key={}",
            self.config.base_url.trim_end_matches('/'),
            self.config.api_version,
            self.config.model,
            GENERATE_CONTENT,
            self.config.api_key
        )
    }

    /// Sends the request and parses the response body.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails, the service answers with a
    /// non-success status, or the response cannot be parsed.
    pub async fn generate_response(&self, request: &Request) -> Result<Response, ChatError> {
        debug!(
            model = %self.config.model,
            turns = request.contents.len(),
            "sending generateContent request"
        );

        let response = self
            .client
            .post(self.build_url())
            .json(request)
            .send()
            .await
            .map_err(reqwest::Error::without_url)?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(ChatError::new(format!(
                "Request failed with status {}: {}",
                status,
                api_error_message(&error_body)
            )));
        }

        let body = response.text().await.map_err(reqwest::Error::without_url)?;
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl ContentGenerator for GeminiClient {
    async fn generate(&self, request: &Request) -> Result<Response, ChatError> {
        self.generate_response(request).await
    }
}

/// Extracts `error.message` from an API error body, falling back to the raw body.
fn api_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| value["error"]["message"].as_str().map(str::to_owned))
        .unwrap_or_else(|| body.trim().to_string())
}
