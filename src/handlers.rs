use crate::db_storage::page_bounds;
use crate::errors::AppError;
use crate::inquiry::InquiryService;
use crate::models::*;
use axum::{
    async_trait,
    extract::{FromRequestParts, Path, Query, State},
    http::{request::Parts, StatusCode},
    Json,
};
use serde_json::json;
use std::sync::Arc;

/// Header carrying the user id, set by the authentication layer in front of this service.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Shared application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Inquiry pipeline (fetcher, classifier and report store).
    pub inquiries: Arc<InquiryService>,
}

/// Authenticated caller, resolved from [`USER_ID_HEADER`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser {
    pub id: i64,
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(USER_ID_HEADER)
            .ok_or_else(|| AppError::Unauthorized(format!("missing {} header", USER_ID_HEADER)))?;

        raw.to_str()
            .ok()
            .and_then(|v| v.trim().parse::<i64>().ok())
            .filter(|id| *id > 0)
            .map(|id| AuthUser { id })
            .ok_or_else(|| AppError::Unauthorized(format!("malformed {} header", USER_ID_HEADER)))
    }
}

/// Health check endpoint.
pub async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "rust-complyance-api",
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}

/// POST /api/v1/inquiries
///
/// Runs a full compliance inquiry for a CPF or CNPJ: provider lookups,
/// risk analysis and persistence.
pub async fn create_inquiry(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(body): Json<InquiryRequest>,
) -> Result<Json<InquiryResponse>, AppError> {
    let document = body
        .document
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .ok_or_else(|| AppError::BadRequest("document is required".to_string()))?;

    tracing::info!("POST /inquiries - user {}", user.id);

    let outcome = state
        .inquiries
        .run_inquiry(user.id, document, body.focus.as_deref())
        .await?;

    Ok(Json(InquiryResponse {
        success: true,
        report_id: outcome.report_id,
        aggregate: outcome.aggregate,
        analysis: outcome.report,
        skipped: outcome.skipped,
    }))
}

/// GET /api/v1/reports
///
/// Lists the caller's reports, newest first, with per-kind and per-risk counts.
pub async fn list_reports(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Query(params): Query<ReportListQuery>,
) -> Result<Json<ReportListResponse>, AppError> {
    let (limit, offset) = page_bounds(params.limit, params.offset);
    tracing::info!(
        "GET /reports - user {} (limit {}, offset {})",
        user.id,
        limit,
        offset
    );

    let store = state.inquiries.store();
    let reports = store.list(user.id, limit, offset).await?;
    let stats = store.stats(user.id).await?;

    Ok(Json(ReportListResponse {
        success: true,
        reports,
        stats,
    }))
}

/// GET /api/v1/reports/:id
pub async fn get_report(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<ReportResponse>, AppError> {
    tracing::info!("GET /reports/{} - user {}", id, user.id);

    let report = state
        .inquiries
        .store()
        .get(id, user.id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Report {} not found", id)))?;

    Ok(Json(ReportResponse {
        success: true,
        report,
    }))
}
