//! Job records and their state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use trafficscope_core::{Location, LocationReport};

/// Hard cap on locations processed per job. The API layer rejects larger
/// batches up front; the fan-out controller truncates defensively as well.
pub const MAX_LOCATIONS_PER_JOB: usize = 20;

/// Job lifecycle states. `Done`, `Failed`, and `Canceled` are terminal:
/// a job never leaves them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Done,
    Failed,
    Canceled,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Failed | JobStatus::Canceled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Done => "done",
            JobStatus::Failed => "failed",
            JobStatus::Canceled => "canceled",
        }
    }
}

/// What a caller submits: the batch of locations plus per-job options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobPayload {
    pub locations: Vec<Location>,
    /// Proxy hint forwarded to every location analysis in this job.
    #[serde(default)]
    pub proxy: Option<String>,
    /// Absolute base URL that derived screenshot links are joined onto.
    #[serde(default)]
    pub request_base_url: Option<String>,
}

/// Accumulator for successful location outputs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobResult {
    pub count: usize,
    pub locations: Vec<LocationReport>,
}

/// One submitted job. Owned by the record store; mutated only by the worker
/// currently processing it, except for the cancellation flag and status,
/// which `cancel` may set from outside.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: String,
    pub status: JobStatus,
    pub payload: JobPayload,
    pub result: JobResult,
    /// Human-readable failure summary, set only on terminal `Failed`.
    pub error: Option<String>,
    /// Locations finished so far, success or failure.
    pub completed: usize,
    /// Locations that failed so far.
    pub failure: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// One-way latch set by `cancel`; never cleared.
    pub cancel_requested: bool,
    /// Latch ensuring the external persistence collaborator logs this job
    /// at most once.
    pub logged_to_store: bool,
}

impl JobRecord {
    pub fn new(id: String, payload: JobPayload) -> Self {
        let now = Utc::now();
        Self {
            id,
            status: JobStatus::Pending,
            payload,
            result: JobResult::default(),
            error: None,
            completed: 0,
            failure: 0,
            created_at: now,
            updated_at: now,
            cancel_requested: false,
            logged_to_store: false,
        }
    }

    /// Refresh `updated_at`. Called on every status or counter change.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Number of locations in the submitted payload.
    pub fn locations_count(&self) -> usize {
        self.payload.locations.len()
    }
}
