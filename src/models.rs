use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;

// ============ Documents ============

/// Kind of a Brazilian tax document, decided by digit count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocumentKind {
    /// Personal identifier, 11 digits.
    #[serde(rename = "CPF")]
    Cpf,
    /// Organizational identifier, 14 digits.
    #[serde(rename = "CNPJ")]
    Cnpj,
}

impl DocumentKind {
    pub const CPF_LEN: usize = 11;
    pub const CNPJ_LEN: usize = 14;

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Cpf => "CPF",
            DocumentKind::Cnpj => "CNPJ",
        }
    }

    /// Digit count of a canonical document of this kind.
    pub fn digit_len(&self) -> usize {
        match self {
            DocumentKind::Cpf => Self::CPF_LEN,
            DocumentKind::Cnpj => Self::CNPJ_LEN,
        }
    }

    /// The kind found on the other side of a relationship.
    pub fn opposite(&self) -> DocumentKind {
        match self {
            DocumentKind::Cpf => DocumentKind::Cnpj,
            DocumentKind::Cnpj => DocumentKind::Cpf,
        }
    }

    /// Label given to related entities discovered while expanding from a document of this kind.
    pub fn relation_label(&self) -> &'static str {
        match self {
            DocumentKind::Cnpj => RELATION_OWNER,
            DocumentKind::Cpf => RELATION_COMPANY,
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CPF" => Ok(DocumentKind::Cpf),
            "CNPJ" => Ok(DocumentKind::Cnpj),
            other => Err(format!("unknown document kind '{}'", other)),
        }
    }
}

pub const RELATION_OWNER: &str = "owner/shareholder";
pub const RELATION_COMPANY: &str = "related company";

/// A canonical (digits only) document with its kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Document {
    pub kind: DocumentKind,
    pub digits: String,
}

// ============ Inquiry Aggregate ============

/// Raw provider payload for one document. The provider publishes no schema,
/// so it is kept as loosely-typed JSON.
pub type FetchedRecord = serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrimaryDocument {
    pub kind: DocumentKind,
    pub document: String,
    pub record: FetchedRecord,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelatedEntity {
    pub kind: DocumentKind,
    pub document: String,
    pub record: FetchedRecord,
    pub relation_label: String,
}

/// Primary record plus the bounded set of related records fetched from it.
///
/// `related` never holds more than five entries and never repeats a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Aggregate {
    pub primary: PrimaryDocument,
    pub related: Vec<RelatedEntity>,
}

impl Aggregate {
    /// Primary document followed by every related document, in aggregate order.
    pub fn documents(&self) -> Vec<String> {
        std::iter::once(self.primary.document.clone())
            .chain(self.related.iter().map(|r| r.document.clone()))
            .collect()
    }

    pub fn related_documents_csv(&self) -> String {
        self.related
            .iter()
            .map(|r| r.document.as_str())
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Why a candidate related document is missing from the aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message", rename_all = "snake_case")]
pub enum SkipReason {
    /// The provider lookup failed.
    FetchFailed(String),
    /// More candidates were found than the expansion bound allows.
    LimitExceeded,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedDocument {
    pub kind: DocumentKind,
    pub document: String,
    pub reason: SkipReason,
}

// ============ Risk Report ============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
            RiskLevel::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiskLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "LOW" => Ok(RiskLevel::Low),
            "MEDIUM" => Ok(RiskLevel::Medium),
            "HIGH" => Ok(RiskLevel::High),
            "CRITICAL" => Ok(RiskLevel::Critical),
            other => Err(format!("unknown risk level '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AlertSeverity {
    Info,
    Warning,
    Critical,
}

impl AlertSeverity {
    /// Case-insensitive parse; anything unrecognised is treated as `INFO`.
    pub fn parse_lenient(s: &str) -> Self {
        match s.trim().to_ascii_uppercase().as_str() {
            "CRITICAL" => AlertSeverity::Critical,
            "WARNING" => AlertSeverity::Warning,
            _ => AlertSeverity::Info,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    #[serde(rename = "type")]
    pub alert_type: String,
    pub severity: AlertSeverity,
    pub description: String,
}

/// The five narrative sections every report carries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailedAnalysis {
    pub registration_data: String,
    pub fiscal_situation: String,
    pub relationships: String,
    pub judicial_proceedings: String,
    pub reputation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskReport {
    pub summary: String,
    pub risk_level: RiskLevel,
    pub risk_score: u8,
    pub alerts: Vec<Alert>,
    pub detailed_analysis: DetailedAnalysis,
    pub recommendations: Vec<String>,
    pub analyzed_documents: Vec<String>,
    pub analyzed_at: DateTime<Utc>,
}

// ============ Stored Reports ============

/// Everything the report store persists for one finished inquiry.
#[derive(Debug, Clone)]
pub struct NewReport {
    pub user_id: i64,
    pub document_type: DocumentKind,
    pub document_number: String,
    pub related_documents: String,
    pub inquiry_payload: serde_json::Value,
    pub risk_analysis: serde_json::Value,
    pub risk_level: RiskLevel,
}

impl NewReport {
    pub fn from_inquiry(
        user_id: i64,
        aggregate: &Aggregate,
        report: &RiskReport,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            user_id,
            document_type: aggregate.primary.kind,
            document_number: aggregate.primary.document.clone(),
            related_documents: aggregate.related_documents_csv(),
            inquiry_payload: serde_json::to_value(aggregate)?,
            risk_analysis: serde_json::to_value(report)?,
            risk_level: report.risk_level,
        })
    }
}

/// A persisted report, with both payloads decoded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredReport {
    pub id: i64,
    pub user_id: i64,
    pub document_type: DocumentKind,
    pub document_number: String,
    pub related_documents: Vec<String>,
    pub aggregate: Aggregate,
    pub analysis: RiskReport,
    pub risk_level: RiskLevel,
    pub created_at: DateTime<Utc>,
}

/// Per-user report counts by document kind and risk level.
#[derive(Debug, Clone, Default, PartialEq, Eq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportStats {
    pub total_reports: i64,
    pub cpf_count: i64,
    pub cnpj_count: i64,
    pub low_risk_count: i64,
    pub medium_risk_count: i64,
    pub high_risk_count: i64,
    pub critical_risk_count: i64,
}

// ============ API Request/Response Models ============

#[derive(Debug, Clone, Deserialize)]
pub struct InquiryRequest {
    pub document: Option<String>,
    pub focus: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InquiryResponse {
    pub success: bool,
    pub report_id: i64,
    pub aggregate: Aggregate,
    pub analysis: RiskReport,
    pub skipped: Vec<SkippedDocument>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReportListQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportListResponse {
    pub success: bool,
    pub reports: Vec<StoredReport>,
    pub stats: ReportStats,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportResponse {
    pub success: bool,
    pub report: StoredReport,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_aggregate() -> Aggregate {
        Aggregate {
            primary: PrimaryDocument {
                kind: DocumentKind::Cpf,
                document: "11144477735".into(),
                record: json!({"Result": []}),
            },
            related: vec![
                RelatedEntity {
                    kind: DocumentKind::Cnpj,
                    document: "11222333000181".into(),
                    record: json!({}),
                    relation_label: RELATION_COMPANY.into(),
                },
                RelatedEntity {
                    kind: DocumentKind::Cnpj,
                    document: "11222333000182".into(),
                    record: json!({}),
                    relation_label: RELATION_COMPANY.into(),
                },
            ],
        }
    }

    #[test]
    fn relation_label_follows_expansion_direction() {
        assert_eq!(DocumentKind::Cnpj.relation_label(), "owner/shareholder");
        assert_eq!(DocumentKind::Cpf.relation_label(), "related company");
        assert_eq!(DocumentKind::Cpf.opposite(), DocumentKind::Cnpj);
    }

    #[test]
    fn aggregate_lists_documents_in_order() {
        let aggregate = sample_aggregate();
        assert_eq!(
            aggregate.documents(),
            vec!["11144477735", "11222333000181", "11222333000182"]
        );
        assert_eq!(
            aggregate.related_documents_csv(),
            "11222333000181,11222333000182"
        );
    }

    #[test]
    fn aggregate_serializes_with_camel_case_keys() {
        let value = serde_json::to_value(sample_aggregate()).unwrap();
        assert_eq!(value["primary"]["kind"], "CPF");
        assert_eq!(value["related"][0]["relationLabel"], "related company");
    }

    #[test]
    fn skip_reason_is_tagged() {
        let value = serde_json::to_value(SkipReason::FetchFailed("status 503".into())).unwrap();
        assert_eq!(value, json!({"type": "fetch_failed", "message": "status 503"}));
        let value = serde_json::to_value(SkipReason::LimitExceeded).unwrap();
        assert_eq!(value, json!({"type": "limit_exceeded"}));
    }

    #[test]
    fn severity_parse_is_lenient() {
        assert_eq!(AlertSeverity::parse_lenient("warning"), AlertSeverity::Warning);
        assert_eq!(AlertSeverity::parse_lenient("CRITICAL"), AlertSeverity::Critical);
        assert_eq!(AlertSeverity::parse_lenient("severe"), AlertSeverity::Info);
    }
}
