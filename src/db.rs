use sqlx::{postgres::PgPoolOptions, PgPool};

/// Schema for persisted compliance reports; safe to run on every start.
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS compliance_reports (
    id BIGSERIAL PRIMARY KEY,
    user_id BIGINT NOT NULL,
    document_type TEXT NOT NULL,
    document_number TEXT NOT NULL,
    related_documents TEXT,
    inquiry_payload JSONB NOT NULL,
    risk_analysis JSONB NOT NULL,
    risk_level TEXT NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX IF NOT EXISTS idx_reports_user ON compliance_reports(user_id);
CREATE INDEX IF NOT EXISTS idx_reports_created ON compliance_reports(created_at DESC);
"#;

pub struct Database {
    pub pool: PgPool,
}

impl Database {
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;

        sqlx::query("SELECT 1").execute(&pool).await?;

        Ok(Self { pool })
    }

    pub async fn ensure_schema(&self) -> anyhow::Result<()> {
        sqlx::raw_sql(SCHEMA).execute(&self.pool).await?;
        tracing::info!("compliance_reports schema ready");
        Ok(())
    }
}
