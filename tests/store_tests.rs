//! Integration tests for the SQLite store
//!
//! These tests verify:
//! - Database file and schema creation on open
//! - Prior scan and protocol detection lookups feeding a probe
//! - Run persistence and read-back across reopen
//! - One store shared by a concurrent batch
//!
//! Tests use REAL SQLite databases (no mocks) in a temp directory.

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use rusqlite::Connection;
use storefront_probe::config::ProbeConfig;
use storefront_probe::store::{ProtocolDetection, ScanRef};
use storefront_probe::{
    FakeTransport, ProbeRequest, ProbeStore, Prober, RunStatus, SqliteStore, StepAction,
    StepStatus, TestType,
};
use tempfile::TempDir;

fn seeded_store(dir: &TempDir) -> Arc<SqliteStore> {
    let store = SqliteStore::open(dir.path().join("probe.db")).unwrap();
    store
        .record_scan(&ScanRef {
            scan_id: "scan-42".to_string(),
            domain: "shop.test".to_string(),
            category: Some("electronics".to_string()),
            scanned_at: Utc.with_ymd_and_hms(2026, 5, 1, 9, 30, 0).unwrap(),
        })
        .unwrap();
    store
        .record_protocol_detection(
            "scan-42",
            &ProtocolDetection {
                protocol: "x402".to_string(),
                detected: true,
            },
        )
        .unwrap();
    Arc::new(store)
}

fn passing_store_front() -> FakeTransport {
    FakeTransport::new()
        .with_get(
            "https://shop.test/sitemap.xml",
            200,
            "<urlset><url><loc>https://shop.test/products/cable</loc></url></urlset>",
        )
        .with_get(
            "https://shop.test/products/cable",
            200,
            r#"<link rel="stylesheet" href="https://cdn.shopify.com/theme.css">
               <script type="application/ld+json">{"@type":"Product","name":"USB Cable",
               "offers":[{"price":12.5,"priceCurrency":"EUR"}]}</script>"#,
        )
        .with_get(
            "https://shop.test/products/cable.js",
            200,
            r#"{"variants":[{"id":7,"available":true}]}"#,
        )
        .with_post("https://shop.test/cart/add.js", 200, "{}")
        .with_get("https://shop.test/checkout", 200, "<h1>Checkout</h1>")
}

#[test]
fn test_open_creates_file_and_schema() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("probe.db");
    let _store = SqliteStore::open(&path).unwrap();
    assert!(path.exists());

    let conn = Connection::open(&path).unwrap();
    let mut stmt = conn
        .prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
        .unwrap();
    let tables: Vec<String> = stmt
        .query_map([], |row| row.get(0))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    for table in ["protocol_detections", "scans", "test_runs"] {
        assert!(tables.contains(&table.to_string()), "missing {}", table);
    }
}

#[test]
fn test_reopen_keeps_existing_rows() {
    let dir = TempDir::new().unwrap();
    drop(seeded_store(&dir));

    let reopened = SqliteStore::open(dir.path().join("probe.db")).unwrap();
    let scan = reopened.lookup_prior_scan("shop.test").unwrap().unwrap();
    assert_eq!(scan.scan_id, "scan-42");
    assert_eq!(
        scan.scanned_at,
        Utc.with_ymd_and_hms(2026, 5, 1, 9, 30, 0).unwrap()
    );
}

#[test]
fn test_probe_uses_prior_scan_and_persists_run() {
    let dir = TempDir::new().unwrap();
    let store = seeded_store(&dir);

    let prober = Prober::new(ProbeConfig::for_tests())
        .with_transport(passing_store_front())
        .with_store(store.clone());
    let run = prober
        .run(&ProbeRequest::new("shop.test", TestType::FullFlow))
        .unwrap();

    assert_eq!(run.status, RunStatus::Passed);
    assert_eq!(run.category, "electronics");
    assert_eq!(
        run.step(StepAction::PaymentProtocol).unwrap().status,
        StepStatus::Passed
    );

    let saved = store.latest_test_run("shop.test").unwrap().unwrap();
    assert_eq!(saved.id, run.id);
    assert_eq!(saved.status, RunStatus::Passed);
    assert_eq!(saved.steps.len(), 5);
    assert_eq!(saved.product().unwrap().name, "USB Cable");
    assert_eq!(store.count_test_runs("shop.test").unwrap(), 1);
}

#[test]
fn test_upsert_replaces_by_id() {
    let dir = TempDir::new().unwrap();
    let store = seeded_store(&dir);

    let prober = Prober::new(ProbeConfig::for_tests())
        .with_transport(FakeTransport::new())
        .with_store(store.clone());
    let mut run = prober
        .run(&ProbeRequest::new("shop.test", TestType::Browse))
        .unwrap();
    assert_eq!(run.status, RunStatus::Blocked);

    run.category = "home".to_string();
    let id = store.upsert_test_run(&run).unwrap();
    assert_eq!(id, run.id);
    assert_eq!(store.count_test_runs("shop.test").unwrap(), 1);
    assert_eq!(
        store.latest_test_run("shop.test").unwrap().unwrap().category,
        "home"
    );
}

#[test]
fn test_batch_shares_one_store() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(SqliteStore::open(dir.path().join("probe.db")).unwrap());

    let prober = Prober::new(ProbeConfig::for_tests())
        .with_transport(FakeTransport::new())
        .with_store(store.clone());
    let requests: Vec<ProbeRequest> = (0..4)
        .map(|i| ProbeRequest::new(format!("store{}.test", i), TestType::Checkout))
        .collect();

    let results = prober.run_batch(&requests);
    assert!(results.iter().all(|r| r.is_ok()));
    for i in 0..4 {
        assert_eq!(
            store.count_test_runs(&format!("store{}.test", i)).unwrap(),
            1
        );
    }
}

#[test]
fn test_missing_scan_means_no_detections() {
    let dir = TempDir::new().unwrap();
    let store = seeded_store(&dir);
    assert!(store.lookup_prior_scan("elsewhere.test").unwrap().is_none());
    assert!(store.lookup_protocol_detections("scan-0").unwrap().is_empty());
}
