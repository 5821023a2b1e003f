//! Compliance inquiry workflow shared by the HTTP handlers.
//!
//! 1. Expand the document into an aggregate (primary + related records)
//! 2. Send the aggregate to the risk classifier
//! 3. Persist aggregate and report together
//!
//! Nothing is persisted unless a validated report exists.

use crate::analysis::RiskAnalyzer;
use crate::config::Config;
use crate::db_storage::ReportStore;
use crate::errors::{AppError, ResultExt};
use crate::expansion::{Expander, ExpansionOptions};
use crate::models::{Aggregate, NewReport, RiskReport, SkippedDocument};
use crate::openai_client::{OpenAiClassifier, RiskClassifier};
use crate::services::{BigDataService, RecordFetcher};
use std::sync::Arc;
use tracing::Instrument;
use uuid::Uuid;

/// Result of one completed inquiry.
#[derive(Debug, Clone)]
pub struct InquiryOutcome {
    pub report_id: i64,
    pub aggregate: Aggregate,
    pub report: RiskReport,
    pub skipped: Vec<SkippedDocument>,
}

pub struct InquiryService {
    expander: Expander,
    analyzer: RiskAnalyzer,
    store: Arc<dyn ReportStore>,
}

impl InquiryService {
    pub fn new(
        fetcher: Arc<dyn RecordFetcher>,
        classifier: Arc<dyn RiskClassifier>,
        store: Arc<dyn ReportStore>,
        options: ExpansionOptions,
    ) -> Self {
        Self {
            expander: Expander::new(fetcher, options),
            analyzer: RiskAnalyzer::new(classifier),
            store,
        }
    }

    /// Wires the BigData fetcher and OpenAI classifier from configuration.
    pub fn from_config(config: &Config, store: Arc<dyn ReportStore>) -> Result<Self, AppError> {
        Ok(Self::new(
            Arc::new(BigDataService::new(config)?),
            Arc::new(OpenAiClassifier::new(config)?),
            store,
            ExpansionOptions::from_config(config),
        ))
    }

    pub fn store(&self) -> &Arc<dyn ReportStore> {
        &self.store
    }

    pub async fn run_inquiry(
        &self,
        user_id: i64,
        raw_document: &str,
        focus: Option<&str>,
    ) -> Result<InquiryOutcome, AppError> {
        let span = tracing::info_span!("inquiry", inquiry_id = %Uuid::new_v4(), user_id);
        self.run(user_id, raw_document, focus).instrument(span).await
    }

    async fn run(
        &self,
        user_id: i64,
        raw_document: &str,
        focus: Option<&str>,
    ) -> Result<InquiryOutcome, AppError> {
        tracing::info!("Step 1: Expanding document");
        let expansion = self.expander.expand(raw_document).await?;
        let aggregate = expansion.aggregate;

        tracing::info!(
            "Step 2: Analysing {} {} with {} related",
            aggregate.primary.kind,
            aggregate.primary.document,
            aggregate.related.len()
        );
        let report = self.analyzer.analyze(&aggregate, focus).await?;

        tracing::info!("Step 3: Persisting report ({})", report.risk_level);
        let new_report = NewReport::from_inquiry(user_id, &aggregate, &report)
            .map_err(|e| AppError::InternalError(format!("Failed to serialize report: {}", e)))?;
        let report_id = self
            .store
            .insert(new_report)
            .await
            .context("persisting compliance report")?;

        Ok(InquiryOutcome {
            report_id,
            aggregate,
            report,
            skipped: expansion.skipped,
        })
    }
}
