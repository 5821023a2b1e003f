//! Risk analysis of an inquiry aggregate.
//!
//! The classifier is a black box; this module owns what goes in (rubric,
//! optional focus, serialized aggregate) and what is accepted back. A reply
//! is only accepted when it carries both `riskLevel` and `riskScore`.
//! `analyzedAt` is always stamped here, and `analyzedDocuments` is filled
//! from the aggregate when the model leaves it out.

use crate::errors::AppError;
use crate::models::{Aggregate, Alert, AlertSeverity, DetailedAnalysis, RiskLevel, RiskReport};
use crate::openai_client::RiskClassifier;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::sync::Arc;

pub const COMPLIANCE_SYSTEM_PROMPT: &str = r#"You are a compliance, due diligence and corporate/individual risk analyst. You review registration, financial and relationship data for Brazilian individuals (CPF) and companies (CNPJ) to identify compliance, money laundering, fraud and reputational risk.

Analyse the data provided and answer with a single JSON object with EXACTLY this structure:

{
  "summary": "Executive summary, 3-4 paragraphs, Markdown",
  "riskLevel": "LOW|MEDIUM|HIGH|CRITICAL",
  "riskScore": 0-100,
  "alerts": [
    { "type": "Alert type", "severity": "INFO|WARNING|CRITICAL", "description": "Detailed description" }
  ],
  "detailedAnalysis": {
    "registrationData": "Markdown",
    "fiscalSituation": "Markdown",
    "relationships": "Markdown",
    "judicialProceedings": "Markdown",
    "reputation": "Markdown"
  },
  "recommendations": ["Specific, actionable recommendations"],
  "analyzedDocuments": ["Every CPF/CNPJ analysed"],
  "analyzedAt": "ISO 8601 timestamp"
}

Formatting: use **bold** for key facts, figures and dates, bullet lists for enumerations, ### for subheadings and > for important remarks. Keep paragraphs short.

RISK TIERS:
1. CRITICAL (90-100): serious impediments, confirmed fraud, criminal proceedings, PEP with irregularities
2. HIGH (70-89): multiple irregularities, relevant lawsuits, serious tax debts
3. MEDIUM (40-69): some irregularities, minor tax issues, civil lawsuits
4. LOW (0-39): regular standing, no significant issues

ASPECTS TO REVIEW:
- CPF/CNPJ status (active, suspended, cancelled, pending)
- Age of the person or company
- Completeness and consistency of registration data
- Corporate relationships (shareholders, companies)
- PEP (politically exposed person) indications
- Judicial and administrative proceedings
- Tax situation
- Red flags

Be professional and objective. Base the analysis only on the data provided and never invent information."#;

/// System prompt with the optional focus appended; the rubric is never replaced.
pub fn build_system_prompt(focus: Option<&str>) -> String {
    match focus.map(str::trim).filter(|f| !f.is_empty()) {
        Some(focus) => format!(
            "{}\n\nSPECIFIC FOCUS REQUESTED: {}\n\nPay special attention to this aspect, without neglecting the other evaluation criteria.",
            COMPLIANCE_SYSTEM_PROMPT, focus
        ),
        None => COMPLIANCE_SYSTEM_PROMPT.to_string(),
    }
}

pub fn build_user_prompt(aggregate: &Aggregate) -> Result<String, AppError> {
    let payload = serde_json::to_string_pretty(aggregate)
        .map_err(|e| AppError::InternalError(format!("Failed to serialize inquiry: {}", e)))?;
    Ok(format!(
        "Analyse the following data and return the compliance analysis as JSON with Markdown content:\n\n{}",
        payload
    ))
}

pub struct RiskAnalyzer {
    classifier: Arc<dyn RiskClassifier>,
}

impl RiskAnalyzer {
    pub fn new(classifier: Arc<dyn RiskClassifier>) -> Self {
        Self { classifier }
    }

    pub async fn analyze(
        &self,
        aggregate: &Aggregate,
        focus: Option<&str>,
    ) -> Result<RiskReport, AppError> {
        let system_prompt = build_system_prompt(focus);
        let user_prompt = build_user_prompt(aggregate)?;

        let content = self
            .classifier
            .classify(&system_prompt, &user_prompt)
            .await?;

        let report = post_process(&content, aggregate, Utc::now())?;
        tracing::info!(
            "{} rated {} {} as {} ({})",
            self.classifier.model_name(),
            aggregate.primary.kind,
            aggregate.primary.document,
            report.risk_level,
            report.risk_score
        );
        Ok(report)
    }
}

/// Validates and completes a raw classifier reply.
pub fn post_process(
    content: &str,
    aggregate: &Aggregate,
    analyzed_at: DateTime<Utc>,
) -> Result<RiskReport, AppError> {
    let value: Value = serde_json::from_str(content).map_err(|e| {
        AppError::ExternalApiError(format!("Risk classifier reply is not JSON: {}", e))
    })?;
    let Some(body) = value.as_object() else {
        return Err(AppError::ExternalApiError(
            "Risk classifier reply is not a JSON object".to_string(),
        ));
    };

    let risk_level = match body.get("riskLevel") {
        None | Some(Value::Null) => {
            return Err(AppError::IncompleteAnalysis("missing riskLevel".to_string()))
        }
        Some(level) => level
            .as_str()
            .and_then(|s| s.parse::<RiskLevel>().ok())
            .ok_or_else(|| AppError::IncompleteAnalysis(format!("invalid riskLevel {}", level)))?,
    };

    let risk_score = match body.get("riskScore") {
        None | Some(Value::Null) => {
            return Err(AppError::IncompleteAnalysis("missing riskScore".to_string()))
        }
        Some(score) => parse_score(score)
            .ok_or_else(|| AppError::IncompleteAnalysis(format!("invalid riskScore {}", score)))?,
    };

    let analyzed_documents = match body.get("analyzedDocuments").and_then(Value::as_array) {
        Some(docs) => docs
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        None => aggregate.documents(),
    };

    Ok(RiskReport {
        summary: string_field(body, "summary"),
        risk_level,
        risk_score,
        alerts: body
            .get("alerts")
            .and_then(Value::as_array)
            .map(|alerts| alerts.iter().filter_map(parse_alert).collect())
            .unwrap_or_default(),
        detailed_analysis: body
            .get("detailedAnalysis")
            .and_then(Value::as_object)
            .map(|sections| DetailedAnalysis {
                registration_data: string_field(sections, "registrationData"),
                fiscal_situation: string_field(sections, "fiscalSituation"),
                relationships: string_field(sections, "relationships"),
                judicial_proceedings: string_field(sections, "judicialProceedings"),
                reputation: string_field(sections, "reputation"),
            })
            .unwrap_or_default(),
        recommendations: body
            .get("recommendations")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default(),
        analyzed_documents,
        analyzed_at,
    })
}

/// Integer in 0..=100; integral floats and numeric strings are accepted.
fn parse_score(value: &Value) -> Option<u8> {
    let score = match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0 && *f >= 0.0).map(|f| f as u64)),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    }?;
    u8::try_from(score).ok().filter(|s| *s <= 100)
}

fn parse_alert(value: &Value) -> Option<Alert> {
    let alert = value.as_object()?;
    Some(Alert {
        alert_type: string_field(alert, "type"),
        severity: alert
            .get("severity")
            .and_then(Value::as_str)
            .map(AlertSeverity::parse_lenient)
            .unwrap_or(AlertSeverity::Info),
        description: string_field(alert, "description"),
    })
}

fn string_field(map: &Map<String, Value>, key: &str) -> String {
    map.get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}
