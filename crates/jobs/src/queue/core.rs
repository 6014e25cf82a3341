use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::analyzer::LocationAnalyzer;
use crate::record::{JobPayload, JobRecord, JobStatus};

use super::fanout::WorkerContext;
use super::worker::run_worker;

/// Shared job record store. Each record, once claimed by a worker, is
/// mutated only by that worker's fan-out controller; `cancel` may flip the
/// cancellation latch and status from outside under the same lock.
pub(super) type SharedJobs = Arc<RwLock<HashMap<String, JobRecord>>>;

#[derive(Debug, Clone)]
pub struct JobQueueConfig {
    /// Number of background job workers (system-wide concurrent jobs).
    pub max_jobs: usize,
    /// How many locations inside a single job run concurrently.
    pub per_job_concurrency: usize,
    /// Root directory screenshot artifacts are resolved against when
    /// deriving caller-facing URLs.
    pub static_root: PathBuf,
}

impl Default for JobQueueConfig {
    fn default() -> Self {
        Self {
            max_jobs: 2,
            per_job_concurrency: 20,
            static_root: PathBuf::from("static"),
        }
    }
}

/// Queue that accepts jobs (each job a batch of locations) and processes
/// them on a fixed pool of workers. Callers submit, poll with `get`, and
/// `remove` once they have consumed a terminal state.
pub struct JobQueue {
    config: JobQueueConfig,
    analyzer: Arc<dyn LocationAnalyzer>,
    jobs: SharedJobs,
    queue_tx: mpsc::UnboundedSender<String>,
    queue_rx: Arc<Mutex<mpsc::UnboundedReceiver<String>>>,
    running: Arc<AtomicBool>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl JobQueue {
    pub fn new(analyzer: Arc<dyn LocationAnalyzer>, config: JobQueueConfig) -> Self {
        let (queue_tx, queue_rx) = mpsc::unbounded_channel();
        Self {
            config,
            analyzer,
            jobs: Arc::new(RwLock::new(HashMap::new())),
            queue_tx,
            queue_rx: Arc::new(Mutex::new(queue_rx)),
            running: Arc::new(AtomicBool::new(true)),
            workers: Mutex::new(Vec::new()),
        }
    }

    /// Spawn the job workers.
    pub async fn start(&self) {
        self.running.store(true, Ordering::Relaxed);
        let mut workers = self.workers.lock().await;
        for index in 0..self.config.max_jobs {
            let ctx = WorkerContext {
                jobs: Arc::clone(&self.jobs),
                analyzer: Arc::clone(&self.analyzer),
                per_job_concurrency: self.config.per_job_concurrency,
                static_root: self.config.static_root.clone(),
            };
            workers.push(tokio::spawn(run_worker(
                index,
                ctx,
                Arc::clone(&self.queue_rx),
                Arc::clone(&self.running),
            )));
        }
        info!("Started {} job workers", self.config.max_jobs);
    }

    /// Stop all job workers. No worker task survives this call.
    pub async fn stop(&self) {
        self.running.store(false, Ordering::Relaxed);
        let mut workers = self.workers.lock().await;
        for worker in workers.iter() {
            worker.abort();
        }
        for worker in workers.drain(..) {
            if let Err(e) = worker.await {
                if !e.is_cancelled() {
                    error!("Job worker exited abnormally: {}", e);
                }
            }
        }
        info!("Job workers stopped");
    }

    /// Submit a job. Returns immediately with the new job id; processing
    /// happens on the worker pool.
    pub async fn submit(&self, payload: JobPayload) -> String {
        let job_id = Uuid::new_v4().simple().to_string();
        let record = JobRecord::new(job_id.clone(), payload);
        self.jobs.write().await.insert(job_id.clone(), record);
        if self.queue_tx.send(job_id.clone()).is_err() {
            // The receiver lives as long as the queue; this only fires
            // during teardown.
            error!("Admission queue closed; job {} will not be processed", job_id);
        }
        debug!("Job {} submitted", job_id);
        job_id
    }

    /// Get a job by id.
    pub async fn get(&self, job_id: &str) -> Option<JobRecord> {
        self.jobs.read().await.get(job_id).cloned()
    }

    /// Request cancellation of a job.
    ///
    /// Terminal jobs are returned unchanged. Otherwise the job is marked
    /// `Canceled` immediately; location analyses already in flight finish on
    /// their own and their results are discarded.
    pub async fn cancel(&self, job_id: &str) -> Option<JobRecord> {
        let mut jobs = self.jobs.write().await;
        let job = jobs.get_mut(job_id)?;
        if job.status.is_terminal() {
            return Some(job.clone());
        }
        job.cancel_requested = true;
        job.status = JobStatus::Canceled;
        job.touch();
        info!(
            "Job {} canceled ({}/{} locations completed)",
            job_id,
            job.completed,
            job.locations_count()
        );
        Some(job.clone())
    }

    /// Remove a job from tracking. No-op when the id is unknown.
    pub async fn remove(&self, job_id: &str) {
        self.jobs.write().await.remove(job_id);
    }

    /// Set the logged-to-store latch. Returns true when this call set it,
    /// false when it was already set or the job is unknown. The persistence
    /// collaborator keys off the return value to log at most once per job.
    pub async fn mark_logged(&self, job_id: &str) -> bool {
        let mut jobs = self.jobs.write().await;
        match jobs.get_mut(job_id) {
            Some(job) if !job.logged_to_store => {
                job.logged_to_store = true;
                true
            }
            _ => false,
        }
    }

    /// Number of jobs currently tracked (any state).
    pub async fn job_count(&self) -> usize {
        self.jobs.read().await.len()
    }
}
