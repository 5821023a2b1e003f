use crate::errors::{AppError, ResultExt};
use crate::models::{NewReport, ReportStats, StoredReport};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{FromRow, PgPool};
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::sync::RwLock;

pub const DEFAULT_PAGE_SIZE: i64 = 50;
pub const MAX_PAGE_SIZE: i64 = 100;

/// Clamps list paging parameters: limit to `1..=MAX_PAGE_SIZE`, offset to `>= 0`.
pub fn page_bounds(limit: Option<i64>, offset: Option<i64>) -> (i64, i64) {
    (
        limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
        offset.unwrap_or(0).max(0),
    )
}

/// Persistence of finished inquiries.
///
/// Reports are only ever read back by their owner.
#[async_trait]
pub trait ReportStore: Send + Sync {
    /// Persists a report and returns its id. Ids increase monotonically.
    async fn insert(&self, report: NewReport) -> Result<i64, AppError>;

    async fn get(&self, report_id: i64, user_id: i64) -> Result<Option<StoredReport>, AppError>;

    /// Reports of `user_id`, newest first.
    async fn list(
        &self,
        user_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<StoredReport>, AppError>;

    async fn stats(&self, user_id: i64) -> Result<ReportStats, AppError>;
}

/// Row shape shared by both stores; payloads stay as JSON until decoded.
#[derive(Debug, Clone, FromRow)]
struct ReportRow {
    id: i64,
    user_id: i64,
    document_type: String,
    document_number: String,
    related_documents: Option<String>,
    inquiry_payload: Value,
    risk_analysis: Value,
    risk_level: String,
    created_at: DateTime<Utc>,
}

impl ReportRow {
    fn decode(self) -> Result<StoredReport, AppError> {
        let corrupt = |what: &str, e: String| {
            AppError::InternalError(format!("Report {} has an invalid {}: {}", self.id, what, e))
        };

        Ok(StoredReport {
            id: self.id,
            user_id: self.user_id,
            document_type: self
                .document_type
                .parse()
                .map_err(|e| corrupt("document_type", e))?,
            document_number: self.document_number.clone(),
            related_documents: self
                .related_documents
                .as_deref()
                .unwrap_or_default()
                .split(',')
                .filter(|d| !d.is_empty())
                .map(str::to_string)
                .collect(),
            aggregate: serde_json::from_value(self.inquiry_payload.clone())
                .map_err(|e| corrupt("inquiry_payload", e.to_string()))?,
            analysis: serde_json::from_value(self.risk_analysis.clone())
                .map_err(|e| corrupt("risk_analysis", e.to_string()))?,
            risk_level: self
                .risk_level
                .parse()
                .map_err(|e| corrupt("risk_level", e))?,
            created_at: self.created_at,
        })
    }
}

// ============ Postgres ============

pub struct PgReportStore {
    pool: PgPool,
}

impl PgReportStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReportStore for PgReportStore {
    async fn insert(&self, report: NewReport) -> Result<i64, AppError> {
        let (id,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO compliance_reports
                (user_id, document_type, document_number, related_documents,
                 inquiry_payload, risk_analysis, risk_level)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            "#,
        )
        .bind(report.user_id)
        .bind(report.document_type.as_str())
        .bind(&report.document_number)
        .bind(&report.related_documents)
        .bind(&report.inquiry_payload)
        .bind(&report.risk_analysis)
        .bind(report.risk_level.as_str())
        .fetch_one(&self.pool)
        .await
        .with_context(|| format!("inserting report for user {}", report.user_id))?;

        tracing::info!(
            "Stored report {} for {} {} (user {})",
            id,
            report.document_type,
            report.document_number,
            report.user_id
        );
        Ok(id)
    }

    async fn get(&self, report_id: i64, user_id: i64) -> Result<Option<StoredReport>, AppError> {
        sqlx::query_as::<_, ReportRow>(
            "SELECT * FROM compliance_reports WHERE id = $1 AND user_id = $2",
        )
        .bind(report_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .with_context(|| format!("loading report {}", report_id))?
        .map(ReportRow::decode)
        .transpose()
    }

    async fn list(
        &self,
        user_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<StoredReport>, AppError> {
        sqlx::query_as::<_, ReportRow>(
            r#"
            SELECT * FROM compliance_reports
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .with_context(|| format!("listing reports for user {}", user_id))?
        .into_iter()
        .map(ReportRow::decode)
        .collect()
    }

    async fn stats(&self, user_id: i64) -> Result<ReportStats, AppError> {
        let stats = sqlx::query_as::<_, ReportStats>(
            r#"
            SELECT
                COUNT(*) AS total_reports,
                COUNT(*) FILTER (WHERE document_type = 'CPF') AS cpf_count,
                COUNT(*) FILTER (WHERE document_type = 'CNPJ') AS cnpj_count,
                COUNT(*) FILTER (WHERE risk_level = 'LOW') AS low_risk_count,
                COUNT(*) FILTER (WHERE risk_level = 'MEDIUM') AS medium_risk_count,
                COUNT(*) FILTER (WHERE risk_level = 'HIGH') AS high_risk_count,
                COUNT(*) FILTER (WHERE risk_level = 'CRITICAL') AS critical_risk_count
            FROM compliance_reports
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .with_context(|| format!("computing report stats for user {}", user_id))?;

        Ok(stats)
    }
}

// ============ In-memory ============

/// Process-local store with the same semantics as [`PgReportStore`].
#[derive(Default)]
pub struct InMemoryReportStore {
    rows: RwLock<Vec<ReportRow>>,
    next_id: AtomicI64,
}

impl InMemoryReportStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }
}

#[async_trait]
impl ReportStore for InMemoryReportStore {
    async fn insert(&self, report: NewReport) -> Result<i64, AppError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.rows.write().await.push(ReportRow {
            id,
            user_id: report.user_id,
            document_type: report.document_type.as_str().to_string(),
            document_number: report.document_number,
            related_documents: Some(report.related_documents),
            inquiry_payload: report.inquiry_payload,
            risk_analysis: report.risk_analysis,
            risk_level: report.risk_level.as_str().to_string(),
            created_at: Utc::now(),
        });
        Ok(id)
    }

    async fn get(&self, report_id: i64, user_id: i64) -> Result<Option<StoredReport>, AppError> {
        self.rows
            .read()
            .await
            .iter()
            .find(|row| row.id == report_id && row.user_id == user_id)
            .cloned()
            .map(ReportRow::decode)
            .transpose()
    }

    async fn list(
        &self,
        user_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<StoredReport>, AppError> {
        let mut rows: Vec<ReportRow> = self
            .rows
            .read()
            .await
            .iter()
            .filter(|row| row.user_id == user_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        rows.into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .map(ReportRow::decode)
            .collect()
    }

    async fn stats(&self, user_id: i64) -> Result<ReportStats, AppError> {
        let rows = self.rows.read().await;
        let mut stats = ReportStats::default();
        for row in rows.iter().filter(|row| row.user_id == user_id) {
            stats.total_reports += 1;
            match row.document_type.as_str() {
                "CPF" => stats.cpf_count += 1,
                "CNPJ" => stats.cnpj_count += 1,
                _ => {}
            }
            match row.risk_level.as_str() {
                "LOW" => stats.low_risk_count += 1,
                "MEDIUM" => stats.medium_risk_count += 1,
                "HIGH" => stats.high_risk_count += 1,
                "CRITICAL" => stats.critical_risk_count += 1,
                _ => {}
            }
        }
        Ok(stats)
    }
}
