//! Session persistence: filesystem JSON documents with a TTL, plus a bounded
//! in-memory fallback used when the filesystem is unavailable.

use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::risk::RiskLevel;
use crate::types::{ScanReport, ScanTarget};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to {operation} {path}: {source}")]
    Io {
        path: PathBuf,
        operation: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize session: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl StoreError {
    fn io(operation: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            operation,
            source,
        }
    }
}

/// Lightweight listing entry for stored sessions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub id: Uuid,
    pub target: ScanTarget,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub overall_risk: RiskLevel,
    pub total_findings: usize,
}

impl SessionSummary {
    fn of(report: &ScanReport) -> Self {
        Self {
            id: report.session.id,
            target: report.session.target.clone(),
            started_at: report.session.started_at,
            overall_risk: report.risk_assessment.overall,
            total_findings: report.findings.len(),
        }
    }
}

pub trait SessionStore: Send + Sync {
    fn save(&self, report: &ScanReport) -> Result<(), StoreError>;
    fn load(&self, id: Uuid) -> Result<Option<ScanReport>, StoreError>;
    fn recent(&self, limit: usize) -> Result<Vec<SessionSummary>, StoreError>;
}

/// One JSON document per session under a data directory. Documents older
/// than the TTL are pruned on save and treated as absent on load.
pub struct FileStore {
    dir: PathBuf,
    ttl: Duration,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self {
            dir: dir.into(),
            ttl,
        }
    }

    fn path_for(&self, id: Uuid) -> PathBuf {
        self.dir.join(format!("{}.json", id))
    }

    fn is_expired(&self, path: &Path) -> bool {
        let Ok(metadata) = fs::metadata(path) else {
            return false;
        };
        let Ok(modified) = metadata.modified() else {
            return false;
        };
        SystemTime::now()
            .duration_since(modified)
            .map(|age| age > self.ttl)
            .unwrap_or(false)
    }

    fn prune_expired(&self) {
        let Ok(entries) = fs::read_dir(&self.dir) else {
            return;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().is_some_and(|e| e == "json") && self.is_expired(&path) {
                debug!(path = %path.display(), "pruning expired session");
                let _ = fs::remove_file(&path);
            }
        }
    }
}

impl SessionStore for FileStore {
    fn save(&self, report: &ScanReport) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir).map_err(|e| StoreError::io("create", &self.dir, e))?;
        self.prune_expired();
        let path = self.path_for(report.session.id);
        let json = serde_json::to_string_pretty(report)?;
        fs::write(&path, json).map_err(|e| StoreError::io("write", &path, e))?;
        Ok(())
    }

    fn load(&self, id: Uuid) -> Result<Option<ScanReport>, StoreError> {
        let path = self.path_for(id);
        if !path.exists() || self.is_expired(&path) {
            return Ok(None);
        }
        let json = fs::read_to_string(&path).map_err(|e| StoreError::io("read", &path, e))?;
        Ok(Some(serde_json::from_str(&json)?))
    }

    fn recent(&self, limit: usize) -> Result<Vec<SessionSummary>, StoreError> {
        let mut summaries = Vec::new();
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::io("read", &self.dir, e)),
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if !path.extension().is_some_and(|e| e == "json") || self.is_expired(&path) {
                continue;
            }
            // unparsable documents are skipped, not fatal
            let Ok(json) = fs::read_to_string(&path) else {
                continue;
            };
            match serde_json::from_str::<ScanReport>(&json) {
                Ok(report) => summaries.push(SessionSummary::of(&report)),
                Err(e) => warn!(path = %path.display(), error = %e, "skipping corrupt session file"),
            }
        }
        summaries.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        summaries.truncate(limit);
        Ok(summaries)
    }
}

/// Bounded FIFO of recent sessions held in memory.
pub struct MemoryStore {
    entries: Mutex<VecDeque<ScanReport>>,
    capacity: usize,
}

impl MemoryStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::new()),
            capacity: capacity.max(1),
        }
    }
}

impl SessionStore for MemoryStore {
    fn save(&self, report: &ScanReport) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        if entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(report.clone());
        Ok(())
    }

    fn load(&self, id: Uuid) -> Result<Option<ScanReport>, StoreError> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        Ok(entries.iter().find(|r| r.session.id == id).cloned())
    }

    fn recent(&self, limit: usize) -> Result<Vec<SessionSummary>, StoreError> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let mut summaries: Vec<SessionSummary> =
            entries.iter().rev().map(SessionSummary::of).collect();
        summaries.truncate(limit);
        Ok(summaries)
    }
}

/// Filesystem store with an in-memory fallback. A failed primary write is
/// logged and absorbed by the fallback so scan results are never lost with
/// the process.
pub struct FallbackStore {
    primary: FileStore,
    fallback: MemoryStore,
}

impl FallbackStore {
    pub fn new(primary: FileStore, fallback: MemoryStore) -> Self {
        Self { primary, fallback }
    }
}

impl SessionStore for FallbackStore {
    fn save(&self, report: &ScanReport) -> Result<(), StoreError> {
        match self.primary.save(report) {
            Ok(()) => Ok(()),
            Err(e) => {
                warn!(error = %e, "primary store failed, using in-memory fallback");
                self.fallback.save(report)
            }
        }
    }

    fn load(&self, id: Uuid) -> Result<Option<ScanReport>, StoreError> {
        match self.primary.load(id) {
            Ok(Some(report)) => Ok(Some(report)),
            Ok(None) => self.fallback.load(id),
            Err(e) => {
                warn!(error = %e, "primary store read failed");
                self.fallback.load(id)
            }
        }
    }

    fn recent(&self, limit: usize) -> Result<Vec<SessionSummary>, StoreError> {
        match self.primary.recent(limit) {
            Ok(summaries) if !summaries.is_empty() => Ok(summaries),
            _ => self.fallback.recent(limit),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ScanSession, ScanTarget};

    fn make_report() -> ScanReport {
        let session = ScanSession::new(ScanTarget::Snippet {
            language: "javascript".to_string(),
        });
        ScanReport::from_session(session)
    }

    #[test]
    fn test_file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path(), Duration::from_secs(3600));
        let report = make_report();
        store.save(&report).unwrap();

        let loaded = store.load(report.session.id).unwrap().unwrap();
        assert_eq!(loaded.session.id, report.session.id);
        assert_eq!(loaded.risk_assessment.overall, RiskLevel::Low);
    }

    #[test]
    fn test_file_store_missing_session() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path(), Duration::from_secs(3600));
        assert!(store.load(Uuid::new_v4()).unwrap().is_none());
    }

    #[test]
    fn test_file_store_expired_session_absent() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path(), Duration::ZERO);
        let report = make_report();
        store.save(&report).unwrap();
        std::thread::sleep(Duration::from_millis(20));
        assert!(store.load(report.session.id).unwrap().is_none());
    }

    #[test]
    fn test_file_store_recent_ordering() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path(), Duration::from_secs(3600));
        let mut older = make_report();
        older.session.started_at = chrono::Utc::now() - chrono::Duration::hours(1);
        let newer = make_report();
        store.save(&older).unwrap();
        store.save(&newer).unwrap();

        let recent = store.recent(10).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].id, newer.session.id);
    }

    #[test]
    fn test_memory_store_capacity_bound() {
        let store = MemoryStore::new(2);
        let first = make_report();
        let second = make_report();
        let third = make_report();
        store.save(&first).unwrap();
        store.save(&second).unwrap();
        store.save(&third).unwrap();

        assert!(store.load(first.session.id).unwrap().is_none());
        assert!(store.load(third.session.id).unwrap().is_some());
        assert_eq!(store.recent(10).unwrap().len(), 2);
    }

    #[test]
    fn test_fallback_store_absorbs_primary_failure() {
        // a file path as the data dir makes every primary write fail
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocked");
        std::fs::write(&blocker, "x").unwrap();
        let store = FallbackStore::new(
            FileStore::new(&blocker, Duration::from_secs(3600)),
            MemoryStore::new(10),
        );
        let report = make_report();
        store.save(&report).unwrap();
        assert!(store.load(report.session.id).unwrap().is_some());
    }
}
