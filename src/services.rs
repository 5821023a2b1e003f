use crate::config::Config;
use crate::errors::AppError;
use crate::models::{DocumentKind, FetchedRecord};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;

/// Dataset selector sent with every lookup.
pub const BIGDATA_DATASETS: &str = "basic_data";

/// Single-document lookup against the data provider.
///
/// One call is one outbound request: no caching and no retries. Callers
/// deduplicate before invoking.
#[async_trait]
pub trait RecordFetcher: Send + Sync {
    async fn fetch(&self, kind: DocumentKind, document: &str) -> Result<FetchedRecord, AppError>;
}

// ============ BigData API Integration ============

pub struct BigDataService {
    client: Client,
    base_url: String,
    token_key: String,
    token_id: String,
}

impl BigDataService {
    pub fn new(config: &Config) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .build()
            .map_err(|e| {
                AppError::InternalError(format!("Failed to create BigData client: {}", e))
            })?;

        Ok(Self {
            client,
            base_url: config.bigdata_base_url.trim_end_matches('/').to_string(),
            token_key: config.bigdata_token_key.clone(),
            token_id: config.bigdata_token_id.clone(),
        })
    }

    fn endpoint(kind: DocumentKind) -> &'static str {
        match kind {
            DocumentKind::Cpf => "/pessoas",
            DocumentKind::Cnpj => "/empresas",
        }
    }
}

#[async_trait]
impl RecordFetcher for BigDataService {
    async fn fetch(&self, kind: DocumentKind, document: &str) -> Result<FetchedRecord, AppError> {
        let url = format!("{}{}", self.base_url, Self::endpoint(kind));

        tracing::info!("BigData: looking up {} {}", kind, document);

        let response = self
            .client
            .post(&url)
            .header("accept", "application/json")
            .header("AccessToken", &self.token_key)
            .header("TokenId", &self.token_id)
            .json(&json!({
                "q": format!("doc{{{}}}", document),
                "Datasets": BIGDATA_DATASETS,
            }))
            .send()
            .await
            .map_err(|e| AppError::ProviderError {
                status: None,
                message: format!("BigData request failed: {}", e),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            tracing::error!("BigData returned error {} for {} {}", status, kind, document);
            return Err(AppError::ProviderError {
                status: Some(status.as_u16()),
                message: error_text,
            });
        }

        let record: FetchedRecord = response.json().await.map_err(|e| AppError::ProviderError {
            status: None,
            message: format!("Failed to parse BigData response: {}", e),
        })?;

        tracing::debug!("BigData: {} {} fetched", kind, document);
        Ok(record)
    }
}
