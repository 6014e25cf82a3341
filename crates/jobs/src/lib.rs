//! Asynchronous job queue for batched location analyses.
//!
//! A job is a batch of up to [`record::MAX_LOCATIONS_PER_JOB`] locations.
//! Jobs are admitted FIFO to a fixed pool of workers; each worker fans the
//! job's locations out to a bounded number of concurrent analyses and
//! aggregates the results back into the job record.

pub mod analyzer;
pub mod links;
pub mod queue;
pub mod record;

pub use analyzer::{AnalyzerError, BlockingAnalyzer, LocationAnalyzer};
pub use queue::{JobQueue, JobQueueConfig};
pub use record::{JobPayload, JobRecord, JobResult, JobStatus, MAX_LOCATIONS_PER_JOB};
