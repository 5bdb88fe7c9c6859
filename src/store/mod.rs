//! Persistence collaborator
//!
//! The prober reads prior scans and protocol detections, and writes one
//! finished `TestRun` per probe. Reads feed the payment step and category
//! resolution; the write is best-effort and its error never reaches the
//! caller of `Prober::run`.
//!
//! - `SqliteStore`: rusqlite-backed, shareable across concurrent runs
//! - `MemoryStore`: in-process maps, for tests and one-shot runs
//! - `NullStore`: knows nothing, accepts every write

mod memory;
mod sqlite;

pub use memory::{MemoryStore, NullStore};
pub use sqlite::SqliteStore;

use crate::probe::types::TestRun;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Store errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid timestamp '{0}' in store")]
    Timestamp(String),

    #[error("Store lock poisoned")]
    Lock,
}

/// Pointer to the most recent scan of a domain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanRef {
    pub scan_id: String,
    pub domain: String,
    /// Merchant category recorded by the scan, if any
    pub category: Option<String>,
    pub scanned_at: DateTime<Utc>,
}

/// One protocol detection result of a scan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolDetection {
    pub protocol: String,
    pub detected: bool,
}

/// Read/write interface the prober depends on
pub trait ProbeStore: Send + Sync {
    /// Most recent scan for `domain`
    fn lookup_prior_scan(&self, domain: &str) -> Result<Option<ScanRef>, StoreError>;

    /// Protocol detections recorded for `scan_id`
    fn lookup_protocol_detections(&self, scan_id: &str)
        -> Result<Vec<ProtocolDetection>, StoreError>;

    /// Insert or replace a finished run; returns its id
    fn upsert_test_run(&self, run: &TestRun) -> Result<String, StoreError>;
}
