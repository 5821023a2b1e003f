//! Fakes and record builders shared by the integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use rust_complyance_api::config::Config;
use rust_complyance_api::db_storage::ReportStore;
use rust_complyance_api::errors::AppError;
use rust_complyance_api::models::{DocumentKind, FetchedRecord, NewReport, ReportStats, StoredReport};
use rust_complyance_api::openai_client::RiskClassifier;
use rust_complyance_api::services::RecordFetcher;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

pub fn create_test_config(bigdata_base_url: String, openai_base_url: String) -> Config {
    Config {
        database_url: "postgresql://test".to_string(),
        port: 8080,
        bigdata_base_url,
        bigdata_token_key: "test_token_key".to_string(),
        bigdata_token_id: "test_token_id".to_string(),
        openai_api_key: "test_openai_key".to_string(),
        openai_base_url,
        openai_model: "gpt-4o-mini".to_string(),
        expansion_concurrency: 1,
        http_timeout_secs: 5,
    }
}

/// Person record listing the given companies.
pub fn cpf_record(name: &str, companies: &[&str]) -> Value {
    json!({
        "Result": [{
            "BasicData": { "Name": name },
            "Companies": companies
                .iter()
                .map(|c| json!({ "TaxIdNumber": c }))
                .collect::<Vec<_>>()
        }]
    })
}

/// Company record with an official name and a shareholder list.
pub fn cnpj_record(official_name: &str, shareholders: &[&str]) -> Value {
    json!({
        "Result": [{
            "BasicData": { "OfficialName": official_name },
            "Shareholders": shareholders
                .iter()
                .map(|s| json!({ "TaxIdNumber": s }))
                .collect::<Vec<_>>()
        }]
    })
}

pub fn report_reply(level: &str, score: u8) -> String {
    json!({
        "summary": "**Regular** standing.",
        "riskLevel": level,
        "riskScore": score,
        "alerts": [
            { "type": "Registration", "severity": "INFO", "description": "Active since 2010" }
        ],
        "detailedAnalysis": {
            "registrationData": "Active",
            "fiscalSituation": "Regular",
            "relationships": "Two companies",
            "judicialProceedings": "None found",
            "reputation": "No adverse media"
        },
        "recommendations": ["Standard onboarding"]
    })
    .to_string()
}

/// In-memory provider with per-document failures and delays.
#[derive(Default)]
pub struct FakeFetcher {
    records: HashMap<String, FetchedRecord>,
    failing: HashSet<String>,
    delays_ms: HashMap<String, u64>,
    calls: Mutex<Vec<(DocumentKind, String)>>,
}

impl FakeFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_record(mut self, document: &str, record: Value) -> Self {
        self.records.insert(document.to_string(), record);
        self
    }

    pub fn failing(mut self, document: &str) -> Self {
        self.failing.insert(document.to_string());
        self
    }

    pub fn with_delay(mut self, document: &str, millis: u64) -> Self {
        self.delays_ms.insert(document.to_string(), millis);
        self
    }

    pub fn calls(&self) -> Vec<(DocumentKind, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl RecordFetcher for FakeFetcher {
    async fn fetch(&self, kind: DocumentKind, document: &str) -> Result<FetchedRecord, AppError> {
        self.calls
            .lock()
            .unwrap()
            .push((kind, document.to_string()));

        if let Some(ms) = self.delays_ms.get(document) {
            tokio::time::sleep(Duration::from_millis(*ms)).await;
        }

        if self.failing.contains(document) {
            return Err(AppError::ProviderError {
                status: Some(500),
                message: format!("lookup of {} failed", document),
            });
        }

        Ok(self
            .records
            .get(document)
            .cloned()
            .unwrap_or_else(|| json!({ "Result": [{ "BasicData": { "TaxIdNumber": document } }] })))
    }
}

/// Classifier that answers with a canned reply and records the prompts it saw.
pub struct FakeClassifier {
    reply: Result<String, AppError>,
    prompts: Mutex<Vec<(String, String)>>,
}

impl FakeClassifier {
    pub fn replying(reply: impl Into<String>) -> Self {
        Self {
            reply: Ok(reply.into()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(error: AppError) -> Self {
        Self {
            reply: Err(error),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<(String, String)> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl RiskClassifier for FakeClassifier {
    async fn classify(&self, system_prompt: &str, user_prompt: &str) -> Result<String, AppError> {
        self.prompts
            .lock()
            .unwrap()
            .push((system_prompt.to_string(), user_prompt.to_string()));
        self.reply.clone()
    }

    fn model_name(&self) -> &str {
        "fake-classifier"
    }
}

/// Store whose every operation fails as an unreachable database would.
#[derive(Default)]
pub struct FailingStore {
    inserts: Mutex<usize>,
}

impl FailingStore {
    pub fn insert_attempts(&self) -> usize {
        *self.inserts.lock().unwrap()
    }
}

#[async_trait]
impl ReportStore for FailingStore {
    async fn insert(&self, _report: NewReport) -> Result<i64, AppError> {
        *self.inserts.lock().unwrap() += 1;
        Err(AppError::DatabaseError(sqlx::Error::PoolTimedOut))
    }

    async fn get(&self, _report_id: i64, _user_id: i64) -> Result<Option<StoredReport>, AppError> {
        Err(AppError::DatabaseError(sqlx::Error::PoolTimedOut))
    }

    async fn list(
        &self,
        _user_id: i64,
        _limit: i64,
        _offset: i64,
    ) -> Result<Vec<StoredReport>, AppError> {
        Err(AppError::DatabaseError(sqlx::Error::PoolTimedOut))
    }

    async fn stats(&self, _user_id: i64) -> Result<ReportStats, AppError> {
        Err(AppError::DatabaseError(sqlx::Error::PoolTimedOut))
    }
}
