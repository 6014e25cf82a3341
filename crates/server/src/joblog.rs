//! Filesystem-backed log of terminal jobs.
//!
//! The queue keeps no durable state; once a caller observes a terminal
//! status, the job's final snapshot is written here and the in-memory
//! record is dropped. Later polls for the same id are served from this
//! store.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use trafficscope_jobs::{JobRecord, JobResult, JobStatus};

#[derive(Debug, Error)]
pub enum JobLogError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Final snapshot of a job, as persisted after terminal-state consumption.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerminalJobLog {
    pub job_id: String,
    pub status: JobStatus,
    pub completed: usize,
    pub locations_count: usize,
    pub result: JobResult,
    pub error: Option<String>,
    pub logged_at: DateTime<Utc>,
}

impl TerminalJobLog {
    pub fn from_record(record: &JobRecord) -> Self {
        Self {
            job_id: record.id.clone(),
            status: record.status,
            completed: record.completed,
            locations_count: record.locations_count(),
            result: record.result.clone(),
            error: record.error.clone(),
            logged_at: Utc::now(),
        }
    }
}

/// Persists terminal job snapshots as `<base_dir>/<job_id>.json`.
pub struct JobLogStore {
    base_dir: PathBuf,
}

impl JobLogStore {
    /// Create a new store, ensuring the directory exists.
    pub fn new(base_dir: impl Into<PathBuf>) -> Result<Self, JobLogError> {
        let base_dir = base_dir.into();
        std::fs::create_dir_all(&base_dir)?;
        Ok(Self { base_dir })
    }

    fn path(&self, job_id: &str) -> PathBuf {
        self.base_dir.join(format!("{}.json", job_id))
    }

    pub fn save(&self, log: &TerminalJobLog) -> Result<(), JobLogError> {
        let json = serde_json::to_string_pretty(log)?;
        std::fs::write(self.path(&log.job_id), json)?;
        Ok(())
    }

    pub fn load(&self, job_id: &str) -> Result<Option<TerminalJobLog>, JobLogError> {
        let path = self.path(job_id);
        if !path.exists() {
            return Ok(None);
        }
        let json = std::fs::read_to_string(path)?;
        Ok(Some(serde_json::from_str(&json)?))
    }

    pub fn exists(&self, job_id: &str) -> bool {
        self.path(job_id).exists()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(job_id: &str) -> TerminalJobLog {
        TerminalJobLog {
            job_id: job_id.to_string(),
            status: JobStatus::Done,
            completed: 2,
            locations_count: 2,
            result: JobResult::default(),
            error: None,
            logged_at: Utc::now(),
        }
    }

    #[test]
    fn save_and_load_roundtrip() {
        let tmp = tempfile::tempdir().unwrap();
        let store = JobLogStore::new(tmp.path()).unwrap();

        store.save(&sample("abc123")).unwrap();
        assert!(store.exists("abc123"));

        let loaded = store.load("abc123").unwrap().unwrap();
        assert_eq!(loaded.job_id, "abc123");
        assert_eq!(loaded.status, JobStatus::Done);
        assert_eq!(loaded.completed, 2);
    }

    #[test]
    fn load_unknown_is_none() {
        let tmp = tempfile::tempdir().unwrap();
        let store = JobLogStore::new(tmp.path()).unwrap();
        assert!(store.load("missing").unwrap().is_none());
        assert!(!store.exists("missing"));
    }
}
