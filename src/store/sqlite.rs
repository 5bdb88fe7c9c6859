//! SQLite store: schema initialization and queries
//!
//! ## Tables
//!
//! - `scans`: one row per readiness scan (domain, category, scanned_at)
//! - `protocol_detections`: per-scan protocol results
//! - `test_runs`: finished probe runs; full run as JSON plus indexed columns
//!
//! Timestamps are RFC 3339 text. The connection sits behind a `Mutex` so a
//! single store serves every thread of a batch.

use crate::probe::types::TestRun;
use crate::store::{ProbeStore, ProtocolDetection, ScanRef, StoreError};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the database at `path` and ensure the schema exists
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        Self::init_schema(&conn)?;
        tracing::debug!(path = %path.display(), "opened probe store");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create tables and indexes (idempotent)
    fn init_schema(conn: &Connection) -> Result<(), StoreError> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS scans (
                id TEXT PRIMARY KEY NOT NULL,
                domain TEXT NOT NULL,
                category TEXT,
                scanned_at TEXT NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS protocol_detections (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                scan_id TEXT NOT NULL,
                protocol TEXT NOT NULL,
                detected BOOLEAN NOT NULL,
                FOREIGN KEY (scan_id) REFERENCES scans(id) ON DELETE CASCADE
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS test_runs (
                id TEXT PRIMARY KEY NOT NULL,
                domain TEXT NOT NULL,
                test_type TEXT NOT NULL,
                status TEXT NOT NULL,
                success_rate REAL NOT NULL,
                tested_at TEXT NOT NULL,
                run_json TEXT NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_scans_domain_time ON scans(domain, scanned_at)",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_detections_scan ON protocol_detections(scan_id)",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_test_runs_domain_time ON test_runs(domain, tested_at)",
            [],
        )?;

        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Lock)
    }

    /// Record a scan row
    pub fn record_scan(&self, scan: &ScanRef) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO scans (id, domain, category, scanned_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                scan.scan_id,
                scan.domain,
                scan.category,
                scan.scanned_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Record one protocol detection against an existing scan
    pub fn record_protocol_detection(
        &self,
        scan_id: &str,
        detection: &ProtocolDetection,
    ) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO protocol_detections (scan_id, protocol, detected) VALUES (?1, ?2, ?3)",
            params![scan_id, detection.protocol, detection.detected],
        )?;
        Ok(())
    }

    /// Most recent persisted run for `domain`
    pub fn latest_test_run(&self, domain: &str) -> Result<Option<TestRun>, StoreError> {
        let conn = self.lock()?;
        let json: Option<String> = conn
            .query_row(
                "SELECT run_json FROM test_runs WHERE domain = ?1
                 ORDER BY tested_at DESC LIMIT 1",
                params![domain],
                |row| row.get(0),
            )
            .optional()?;

        match json {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    /// Number of persisted runs for `domain`
    pub fn count_test_runs(&self, domain: &str) -> Result<usize, StoreError> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM test_runs WHERE domain = ?1",
            params![domain],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}

fn parse_timestamp(text: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(text)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|_| StoreError::Timestamp(text.to_string()))
}

impl ProbeStore for SqliteStore {
    fn lookup_prior_scan(&self, domain: &str) -> Result<Option<ScanRef>, StoreError> {
        let conn = self.lock()?;
        let row: Option<(String, String, Option<String>, String)> = conn
            .query_row(
                "SELECT id, domain, category, scanned_at FROM scans
                 WHERE domain = ?1 ORDER BY scanned_at DESC LIMIT 1",
                params![domain],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )
            .optional()?;

        let Some((scan_id, domain, category, scanned_at)) = row else {
            return Ok(None);
        };
        Ok(Some(ScanRef {
            scan_id,
            domain,
            category,
            scanned_at: parse_timestamp(&scanned_at)?,
        }))
    }

    fn lookup_protocol_detections(
        &self,
        scan_id: &str,
    ) -> Result<Vec<ProtocolDetection>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT protocol, detected FROM protocol_detections
             WHERE scan_id = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![scan_id], |row| {
            Ok(ProtocolDetection {
                protocol: row.get(0)?,
                detected: row.get(1)?,
            })
        })?;

        let mut detections = Vec::new();
        for row in rows {
            detections.push(row?);
        }
        Ok(detections)
    }

    fn upsert_test_run(&self, run: &TestRun) -> Result<String, StoreError> {
        let json = serde_json::to_string(run)?;
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO test_runs
             (id, domain, test_type, status, success_rate, tested_at, run_json)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                run.id,
                run.domain,
                run.test_type.as_str(),
                run.status.as_str(),
                run.success_rate,
                run.tested_at.to_rfc3339(),
                json,
            ],
        )?;
        Ok(run.id.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn scan(id: &str, domain: &str, day: u32) -> ScanRef {
        ScanRef {
            scan_id: id.to_string(),
            domain: domain.to_string(),
            category: Some("retail".to_string()),
            scanned_at: Utc.with_ymd_and_hms(2026, 3, day, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_schema_is_idempotent() {
        let store = SqliteStore::open_in_memory().unwrap();
        let conn = store.lock().unwrap();
        SqliteStore::init_schema(&conn).unwrap();
    }

    #[test]
    fn test_latest_scan_wins() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.record_scan(&scan("old", "shop.test", 1)).unwrap();
        store.record_scan(&scan("new", "shop.test", 9)).unwrap();
        store.record_scan(&scan("other", "else.test", 20)).unwrap();

        let found = store.lookup_prior_scan("shop.test").unwrap().unwrap();
        assert_eq!(found.scan_id, "new");
        assert_eq!(found.category.as_deref(), Some("retail"));
        assert!(store.lookup_prior_scan("nobody.test").unwrap().is_none());
    }

    #[test]
    fn test_detections_keep_insert_order() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.record_scan(&scan("s1", "shop.test", 1)).unwrap();
        for (protocol, detected) in [("ucp", false), ("acp", true)] {
            store
                .record_protocol_detection(
                    "s1",
                    &ProtocolDetection {
                        protocol: protocol.to_string(),
                        detected,
                    },
                )
                .unwrap();
        }

        let detections = store.lookup_protocol_detections("s1").unwrap();
        assert_eq!(detections.len(), 2);
        assert_eq!(detections[1].protocol, "acp");
        assert!(detections[1].detected);
        assert!(store.lookup_protocol_detections("s2").unwrap().is_empty());
    }
}
