//! OpenAI chat-completions transport for the risk classifier.

use crate::config::Config;
use crate::errors::AppError;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

const TEMPERATURE: f64 = 0.3;
const MAX_TOKENS: u32 = 4000;

/// A chat model that answers with a JSON object.
#[async_trait]
pub trait RiskClassifier: Send + Sync {
    /// Sends one system + user exchange and returns the raw JSON text of the reply.
    async fn classify(&self, system_prompt: &str, user_prompt: &str) -> Result<String, AppError>;

    /// Model name for logging.
    fn model_name(&self) -> &str;
}

#[derive(Clone)]
pub struct OpenAiClassifier {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiClassifier {
    pub fn new(config: &Config) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_secs.max(60)))
            .build()
            .map_err(|e| {
                AppError::InternalError(format!("Failed to create OpenAI client: {}", e))
            })?;

        Ok(Self {
            client,
            base_url: config.openai_base_url.trim_end_matches('/').to_string(),
            api_key: config.openai_api_key.clone(),
            model: config.openai_model.clone(),
        })
    }
}

#[derive(Deserialize)]
struct Message {
    content: Option<String>,
}

#[derive(Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[async_trait]
impl RiskClassifier for OpenAiClassifier {
    async fn classify(&self, system_prompt: &str, user_prompt: &str) -> Result<String, AppError> {
        let url = format!("{}/chat/completions", self.base_url);

        tracing::info!("Requesting risk analysis from {}", self.model);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&json!({
                "model": &self.model,
                "messages": [
                    {"role": "system", "content": system_prompt},
                    {"role": "user", "content": user_prompt}
                ],
                "temperature": TEMPERATURE,
                "max_tokens": MAX_TOKENS,
                "response_format": {"type": "json_object"}
            }))
            .send()
            .await
            .map_err(|e| AppError::ExternalApiError(format!("OpenAI request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalApiError(format!(
                "OpenAI API error {}: {}",
                status, body
            )));
        }

        let chat: ChatResponse = response.json().await.map_err(|e| {
            AppError::ExternalApiError(format!("Failed to parse OpenAI response: {}", e))
        })?;

        chat.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| AppError::ExternalApiError("OpenAI returned an empty reply".to_string()))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
