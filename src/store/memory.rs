//! In-process stores

use crate::probe::types::TestRun;
use crate::store::{ProbeStore, ProtocolDetection, ScanRef, StoreError};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
struct Inner {
    scans: HashMap<String, ScanRef>,
    detections: HashMap<String, Vec<ProtocolDetection>>,
    runs: Vec<TestRun>,
}

/// Maps behind a mutex; one prior scan per domain
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a prior scan and its protocol detections
    pub fn with_scan(self, scan: ScanRef, detections: Vec<ProtocolDetection>) -> Self {
        if let Ok(mut inner) = self.inner.lock() {
            inner.detections.insert(scan.scan_id.clone(), detections);
            inner.scans.insert(scan.domain.clone(), scan);
        }
        self
    }

    /// Persisted runs, in write order
    pub fn runs(&self) -> Vec<TestRun> {
        self.inner
            .lock()
            .map(|inner| inner.runs.clone())
            .unwrap_or_default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, StoreError> {
        self.inner.lock().map_err(|_| StoreError::Lock)
    }
}

impl ProbeStore for MemoryStore {
    fn lookup_prior_scan(&self, domain: &str) -> Result<Option<ScanRef>, StoreError> {
        Ok(self.lock()?.scans.get(domain).cloned())
    }

    fn lookup_protocol_detections(
        &self,
        scan_id: &str,
    ) -> Result<Vec<ProtocolDetection>, StoreError> {
        Ok(self
            .lock()?
            .detections
            .get(scan_id)
            .cloned()
            .unwrap_or_default())
    }

    fn upsert_test_run(&self, run: &TestRun) -> Result<String, StoreError> {
        let mut inner = self.lock()?;
        match inner.runs.iter_mut().find(|r| r.id == run.id) {
            Some(existing) => *existing = run.clone(),
            None => inner.runs.push(run.clone()),
        }
        Ok(run.id.clone())
    }
}

/// Store with no prior knowledge that discards writes
#[derive(Debug, Clone, Copy, Default)]
pub struct NullStore;

impl ProbeStore for NullStore {
    fn lookup_prior_scan(&self, _domain: &str) -> Result<Option<ScanRef>, StoreError> {
        Ok(None)
    }

    fn lookup_protocol_detections(
        &self,
        _scan_id: &str,
    ) -> Result<Vec<ProtocolDetection>, StoreError> {
        Ok(Vec::new())
    }

    fn upsert_test_run(&self, run: &TestRun) -> Result<String, StoreError> {
        Ok(run.id.clone())
    }
}
