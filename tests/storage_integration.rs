use std::env;

use chrono::Utc;
use rust_complyance_api::analysis::post_process;
use rust_complyance_api::data::db_storage::{InMemoryReportStore, PgReportStore, ReportStore};
use rust_complyance_api::db::Database;
use rust_complyance_api::models::{
    Aggregate, DocumentKind, NewReport, PrimaryDocument, RelatedEntity, RiskReport,
};
use serde_json::json;
use uuid::Uuid;

fn cnpj_aggregate(document: &str) -> Aggregate {
    Aggregate {
        primary: PrimaryDocument {
            kind: DocumentKind::Cnpj,
            document: document.to_string(),
            record: json!({ "Result": [{ "BasicData": { "OfficialName": "ACME LTDA" } }] }),
        },
        related: vec![RelatedEntity {
            kind: DocumentKind::Cpf,
            document: "12345678909".to_string(),
            record: json!({ "Result": [{ "BasicData": { "Name": "JOAO" } }] }),
            relation_label: "owner/shareholder".to_string(),
        }],
    }
}

fn report_for(aggregate: &Aggregate, level: &str, score: u8) -> RiskReport {
    let reply = json!({
        "summary": "## Summary\nNo relevant findings.",
        "riskLevel": level,
        "riskScore": score,
        "alerts": [
            { "type": "Fiscal", "severity": "warning", "description": "Pending filing" }
        ],
        "detailedAnalysis": {
            "registrationData": "Active",
            "fiscalSituation": "One pending filing",
            "relationships": "Single owner",
            "judicialProceedings": "None",
            "reputation": "Neutral"
        },
        "recommendations": ["Request the latest filing receipt"]
    });
    post_process(&reply.to_string(), aggregate, Utc::now()).unwrap()
}

fn new_report(user_id: i64, aggregate: &Aggregate, report: &RiskReport) -> NewReport {
    NewReport::from_inquiry(user_id, aggregate, report).unwrap()
}

#[tokio::test]
async fn stored_report_round_trips_both_payloads() {
    let store = InMemoryReportStore::new();
    let aggregate = cnpj_aggregate("11222333000181");
    let report = report_for(&aggregate, "MEDIUM", 45);

    let id = store
        .insert(new_report(3, &aggregate, &report))
        .await
        .unwrap();

    let stored = store.get(id, 3).await.unwrap().unwrap();
    assert_eq!(stored.id, id);
    assert_eq!(stored.user_id, 3);
    assert_eq!(stored.document_type, DocumentKind::Cnpj);
    assert_eq!(stored.document_number, "11222333000181");
    assert_eq!(stored.related_documents, vec!["12345678909"]);
    assert_eq!(stored.aggregate, aggregate);
    assert_eq!(stored.analysis, report);
    assert_eq!(
        stored.analysis.detailed_analysis.fiscal_situation,
        "One pending filing"
    );
    assert_eq!(stored.risk_level, report.risk_level);
}

#[tokio::test]
async fn reports_are_scoped_to_their_owner() {
    let store = InMemoryReportStore::new();
    let aggregate = cnpj_aggregate("11222333000181");
    let report = report_for(&aggregate, "LOW", 10);

    let id = store
        .insert(new_report(1, &aggregate, &report))
        .await
        .unwrap();

    assert!(store.get(id, 2).await.unwrap().is_none());
    assert!(store.get(id + 100, 1).await.unwrap().is_none());
    assert!(store.list(2, 50, 0).await.unwrap().is_empty());
    assert_eq!(store.stats(2).await.unwrap().total_reports, 0);
}

#[tokio::test]
async fn list_is_newest_first_and_paged() {
    let store = InMemoryReportStore::new();
    let mut ids = Vec::new();
    for (i, level) in ["LOW", "HIGH", "CRITICAL"].iter().enumerate() {
        let aggregate = cnpj_aggregate(&format!("1122233300018{}", i));
        let report = report_for(&aggregate, level, 20 + i as u8 * 30);
        ids.push(
            store
                .insert(new_report(5, &aggregate, &report))
                .await
                .unwrap(),
        );
    }
    assert!(ids.windows(2).all(|w| w[0] < w[1]));

    let all: Vec<i64> = store
        .list(5, 50, 0)
        .await
        .unwrap()
        .iter()
        .map(|r| r.id)
        .collect();
    assert_eq!(all, vec![ids[2], ids[1], ids[0]]);

    let page: Vec<i64> = store
        .list(5, 1, 1)
        .await
        .unwrap()
        .iter()
        .map(|r| r.id)
        .collect();
    assert_eq!(page, vec![ids[1]]);
}

#[tokio::test]
async fn stats_count_kinds_and_levels() {
    let store = InMemoryReportStore::new();

    let company = cnpj_aggregate("11222333000181");
    let mut person = cnpj_aggregate("11144477735");
    person.primary.kind = DocumentKind::Cpf;

    for (aggregate, level) in [
        (&company, "LOW"),
        (&company, "CRITICAL"),
        (&person, "CRITICAL"),
        (&person, "MEDIUM"),
    ] {
        let report = report_for(aggregate, level, 50);
        store
            .insert(new_report(8, aggregate, &report))
            .await
            .unwrap();
    }

    let stats = store.stats(8).await.unwrap();
    assert_eq!(stats.total_reports, 4);
    assert_eq!(stats.cnpj_count, 2);
    assert_eq!(stats.cpf_count, 2);
    assert_eq!(stats.low_risk_count, 1);
    assert_eq!(stats.medium_risk_count, 1);
    assert_eq!(stats.high_risk_count, 0);
    assert_eq!(stats.critical_risk_count, 2);
}

/// Integration smoke test for the Postgres report store.
/// Marked ignored to avoid running against production by accident; set TEST_DATABASE_URL to run.
#[tokio::test]
#[ignore]
async fn pg_report_store_smoke_test() -> anyhow::Result<()> {
    let db_url = env::var("TEST_DATABASE_URL")
        .or_else(|_| env::var("DATABASE_URL"))
        .map_err(|_| anyhow::anyhow!("Set TEST_DATABASE_URL or DATABASE_URL to run this test"))?;

    let db = Database::new(&db_url).await?;
    db.ensure_schema().await?;
    let store = PgReportStore::new(db.pool.clone());

    // Unique user id so repeated runs do not see each other's rows
    let user_id = (Uuid::new_v4().as_u128() % 1_000_000_000) as i64 + 1_000_000_000;

    let aggregate = cnpj_aggregate("11222333000181");
    let report = report_for(&aggregate, "HIGH", 75);
    let id = store
        .insert(new_report(user_id, &aggregate, &report))
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;

    let stored = store
        .get(id, user_id)
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?
        .ok_or_else(|| anyhow::anyhow!("report {} not found", id))?;
    assert_eq!(stored.aggregate, aggregate);
    assert_eq!(stored.analysis, report);

    let stats = store
        .stats(user_id)
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;
    assert_eq!(stats.total_reports, 1);
    assert_eq!(stats.high_risk_count, 1);
    Ok(())
}
