use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::sleep;

use trafficscope_core::{AnalysisRequest, Location, LocationReport};

use crate::analyzer::{AnalyzerError, LocationAnalyzer};
use crate::queue::{JobQueue, JobQueueConfig};
use crate::record::{JobPayload, JobRecord, JobStatus};

/// Scripted analyzer for queue tests. Fails any request whose `lat` appears
/// in `fail_lats`, and tracks a concurrent-call high-water mark.
struct MockAnalyzer {
    delay: Duration,
    fail_lats: Vec<f64>,
    calls: AtomicUsize,
    active: AtomicUsize,
    high_water: AtomicUsize,
}

impl MockAnalyzer {
    fn new() -> Self {
        Self {
            delay: Duration::ZERO,
            fail_lats: Vec::new(),
            calls: AtomicUsize::new(0),
            active: AtomicUsize::new(0),
            high_water: AtomicUsize::new(0),
        }
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn failing_lats(mut self, lats: &[f64]) -> Self {
        self.fail_lats = lats.to_vec();
        self
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }

    fn high_water_mark(&self) -> usize {
        self.high_water.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl LocationAnalyzer for MockAnalyzer {
    async fn analyze(&self, request: &AnalysisRequest) -> Result<LocationReport, AnalyzerError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        let now_active = self.active.fetch_add(1, Ordering::Relaxed) + 1;
        self.high_water.fetch_max(now_active, Ordering::Relaxed);

        if !self.delay.is_zero() {
            sleep(self.delay).await;
        }
        self.active.fetch_sub(1, Ordering::Relaxed);

        if self.fail_lats.iter().any(|lat| (lat - request.lat).abs() < f64::EPSILON) {
            return Err(AnalyzerError::Analysis(format!(
                "no traffic data at ({}, {})",
                request.lat, request.lng
            )));
        }
        Ok(LocationReport {
            score: 5.0,
            screenshot_path: Some(format!("static/images/shot_{}.png", request.lat)),
            ..Default::default()
        })
    }
}

fn locations(n: usize) -> Vec<Location> {
    (0..n)
        .map(|i| Location {
            lat: i as f64,
            lng: 100.0 + i as f64,
            storefront_direction: "north".to_string(),
            day: None,
            time: None,
        })
        .collect()
}

fn payload(n: usize) -> JobPayload {
    JobPayload {
        locations: locations(n),
        proxy: None,
        request_base_url: Some("http://api.test:8000/".to_string()),
    }
}

fn queue_with(analyzer: Arc<MockAnalyzer>, max_jobs: usize, per_job: usize) -> JobQueue {
    JobQueue::new(
        analyzer,
        JobQueueConfig {
            max_jobs,
            per_job_concurrency: per_job,
            ..Default::default()
        },
    )
}

async fn wait_terminal(queue: &JobQueue, job_id: &str) -> JobRecord {
    for _ in 0..400 {
        if let Some(job) = queue.get(job_id).await {
            if job.status.is_terminal() {
                return job;
            }
        }
        sleep(Duration::from_millis(10)).await;
    }
    panic!("job {} did not reach a terminal state in time", job_id);
}

#[tokio::test]
async fn all_locations_succeed() {
    let analyzer = Arc::new(MockAnalyzer::new());
    let queue = queue_with(Arc::clone(&analyzer), 2, 20);
    queue.start().await;

    let job_id = queue.submit(payload(5)).await;
    let job = wait_terminal(&queue, &job_id).await;

    assert_eq!(job.status, JobStatus::Done);
    assert_eq!(job.completed, 5);
    assert_eq!(job.failure, 0);
    assert_eq!(job.result.count, 5);
    assert_eq!(job.result.locations.len(), 5);
    assert_eq!(analyzer.call_count(), 5);
    assert!(job.error.is_none());

    queue.stop().await;
}

#[tokio::test]
async fn zero_locations_completes_done() {
    let analyzer = Arc::new(MockAnalyzer::new());
    let queue = queue_with(Arc::clone(&analyzer), 1, 20);
    queue.start().await;

    let job_id = queue.submit(payload(0)).await;
    let job = wait_terminal(&queue, &job_id).await;

    assert_eq!(job.status, JobStatus::Done);
    assert_eq!(job.completed, 0);
    assert_eq!(job.result.count, 0);
    assert_eq!(analyzer.call_count(), 0);

    queue.stop().await;
}

#[tokio::test]
async fn all_locations_fail() {
    let analyzer = Arc::new(MockAnalyzer::new().failing_lats(&[0.0, 1.0]));
    let queue = queue_with(analyzer, 1, 20);
    queue.start().await;

    let job_id = queue.submit(payload(2)).await;
    let job = wait_terminal(&queue, &job_id).await;

    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.completed, 2);
    assert_eq!(job.failure, 2);
    assert_eq!(job.result.count, 0);
    let error = job.error.expect("failed job carries an error summary");
    assert!(error.contains("All 2 location(s) failed"));
    assert!(error.contains("no traffic data"));

    queue.stop().await;
}

#[tokio::test]
async fn failure_summary_caps_at_three_messages() {
    let analyzer = Arc::new(MockAnalyzer::new().failing_lats(&[0.0, 1.0, 2.0, 3.0, 4.0]));
    let queue = queue_with(analyzer, 1, 20);
    queue.start().await;

    let job_id = queue.submit(payload(5)).await;
    let job = wait_terminal(&queue, &job_id).await;

    assert_eq!(job.status, JobStatus::Failed);
    let error = job.error.unwrap();
    assert!(error.contains("All 5 location(s) failed"));
    assert!(error.contains("(0, 100)"));
    assert!(error.contains("(2, 102)"));
    assert!(!error.contains("(3, 103)"));
    assert!(!error.contains("(4, 104)"));

    queue.stop().await;
}

#[tokio::test]
async fn partial_failure_is_still_done() {
    // Location 1 of 3 fails; the job is Done with two results.
    let analyzer = Arc::new(MockAnalyzer::new().failing_lats(&[1.0]));
    let queue = queue_with(analyzer, 1, 20);
    queue.start().await;

    let job_id = queue.submit(payload(3)).await;
    let job = wait_terminal(&queue, &job_id).await;

    assert_eq!(job.status, JobStatus::Done);
    assert_eq!(job.completed, 3);
    assert_eq!(job.failure, 1);
    assert_eq!(job.result.count, 2);
    assert!(job.error.is_none());

    queue.stop().await;
}

#[tokio::test]
async fn single_failing_location_fails_the_job() {
    let analyzer = Arc::new(MockAnalyzer::new().failing_lats(&[0.0]));
    let queue = queue_with(analyzer, 1, 20);
    queue.start().await;

    let job_id = queue.submit(payload(1)).await;
    let job = wait_terminal(&queue, &job_id).await;

    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.result.count, 0);
    assert!(job.error.unwrap().contains("no traffic data at (0, 100)"));

    queue.stop().await;
}

#[tokio::test]
async fn successful_locations_get_screenshot_urls() {
    let analyzer = Arc::new(MockAnalyzer::new());
    let queue = queue_with(analyzer, 1, 20);
    queue.start().await;

    let job_id = queue.submit(payload(1)).await;
    let job = wait_terminal(&queue, &job_id).await;

    assert_eq!(job.status, JobStatus::Done);
    assert_eq!(
        job.result.locations[0].screenshot_url.as_deref(),
        Some("http://api.test:8000/static/images/shot_0.png")
    );

    queue.stop().await;
}

#[tokio::test]
async fn per_job_concurrency_is_bounded() {
    let analyzer = Arc::new(MockAnalyzer::new().with_delay(Duration::from_millis(50)));
    let queue = queue_with(Arc::clone(&analyzer), 1, 3);
    queue.start().await;

    let job_id = queue.submit(payload(12)).await;
    let job = wait_terminal(&queue, &job_id).await;

    assert_eq!(job.status, JobStatus::Done);
    assert_eq!(job.completed, 12);
    assert!(
        analyzer.high_water_mark() <= 3,
        "high water {} exceeded per-job concurrency 3",
        analyzer.high_water_mark()
    );

    queue.stop().await;
}

#[tokio::test]
async fn worker_count_bounds_concurrent_jobs() {
    // Single-location jobs: concurrent analyzer calls equal concurrent jobs.
    let analyzer = Arc::new(MockAnalyzer::new().with_delay(Duration::from_millis(50)));
    let queue = queue_with(Arc::clone(&analyzer), 2, 20);
    queue.start().await;

    let mut ids = Vec::new();
    for _ in 0..6 {
        ids.push(queue.submit(payload(1)).await);
    }
    for id in &ids {
        let job = wait_terminal(&queue, id).await;
        assert_eq!(job.status, JobStatus::Done);
    }
    assert!(
        analyzer.high_water_mark() <= 2,
        "high water {} exceeded worker count 2",
        analyzer.high_water_mark()
    );

    queue.stop().await;
}

#[tokio::test]
async fn locations_are_capped_at_twenty() {
    let analyzer = Arc::new(MockAnalyzer::new());
    let queue = queue_with(Arc::clone(&analyzer), 1, 20);
    queue.start().await;

    let job_id = queue.submit(payload(25)).await;
    let job = wait_terminal(&queue, &job_id).await;

    assert_eq!(job.status, JobStatus::Done);
    assert_eq!(job.completed, 20);
    assert_eq!(job.result.count, 20);
    assert_eq!(analyzer.call_count(), 20);

    queue.stop().await;
}

#[tokio::test]
async fn cancel_before_processing_sticks() {
    // Workers not started yet: cancellation lands while the job is queued.
    let analyzer = Arc::new(MockAnalyzer::new());
    let queue = queue_with(Arc::clone(&analyzer), 1, 20);

    let job_id = queue.submit(payload(3)).await;
    let canceled = queue.cancel(&job_id).await.unwrap();
    assert_eq!(canceled.status, JobStatus::Canceled);
    assert!(canceled.cancel_requested);

    // Workers come up, dequeue the job, and must leave it Canceled.
    queue.start().await;
    sleep(Duration::from_millis(100)).await;

    let job = queue.get(&job_id).await.unwrap();
    assert_eq!(job.status, JobStatus::Canceled);
    assert_eq!(job.completed, 0);
    assert_eq!(analyzer.call_count(), 0);

    queue.stop().await;
}

#[tokio::test]
async fn cancel_mid_job_discards_results() {
    let analyzer = Arc::new(MockAnalyzer::new().with_delay(Duration::from_millis(200)));
    let queue = queue_with(analyzer, 1, 1);
    queue.start().await;

    let job_id = queue.submit(payload(5)).await;
    sleep(Duration::from_millis(50)).await;
    let canceled = queue.cancel(&job_id).await.unwrap();
    assert_eq!(canceled.status, JobStatus::Canceled);

    // Give in-flight analyses time to drain.
    sleep(Duration::from_millis(500)).await;

    let job = queue.get(&job_id).await.unwrap();
    assert_eq!(job.status, JobStatus::Canceled);
    assert_eq!(job.result.count, 0);
    assert!(job.completed <= 5);

    queue.stop().await;
}

#[tokio::test]
async fn cancel_terminal_job_is_a_no_op() {
    let analyzer = Arc::new(MockAnalyzer::new());
    let queue = queue_with(analyzer, 1, 20);
    queue.start().await;

    let job_id = queue.submit(payload(2)).await;
    let done = wait_terminal(&queue, &job_id).await;
    assert_eq!(done.status, JobStatus::Done);

    let after_cancel = queue.cancel(&job_id).await.unwrap();
    assert_eq!(after_cancel.status, JobStatus::Done);
    assert!(!after_cancel.cancel_requested);

    queue.stop().await;
}

#[tokio::test]
async fn cancel_unknown_job_is_none() {
    let queue = queue_with(Arc::new(MockAnalyzer::new()), 1, 20);
    assert!(queue.cancel("nope").await.is_none());
}

#[tokio::test]
async fn remove_then_get_is_none() {
    let queue = queue_with(Arc::new(MockAnalyzer::new()), 1, 20);

    let job_id = queue.submit(payload(1)).await;
    assert!(queue.get(&job_id).await.is_some());

    queue.remove(&job_id).await;
    assert!(queue.get(&job_id).await.is_none());

    // Second remove is a no-op.
    queue.remove(&job_id).await;
    assert!(queue.get(&job_id).await.is_none());
}

#[tokio::test]
async fn mark_logged_latch_fires_once() {
    let queue = queue_with(Arc::new(MockAnalyzer::new()), 1, 20);
    let job_id = queue.submit(payload(1)).await;

    assert!(queue.mark_logged(&job_id).await);
    assert!(!queue.mark_logged(&job_id).await);
    assert!(!queue.mark_logged("nope").await);

    let job = queue.get(&job_id).await.unwrap();
    assert!(job.logged_to_store);
}

#[tokio::test]
async fn job_count_tracks_submissions() {
    let queue = queue_with(Arc::new(MockAnalyzer::new()), 1, 20);
    assert_eq!(queue.job_count().await, 0);

    let a = queue.submit(payload(1)).await;
    let _b = queue.submit(payload(1)).await;
    assert_eq!(queue.job_count().await, 2);

    queue.remove(&a).await;
    assert_eq!(queue.job_count().await, 1);
}

#[tokio::test]
async fn stop_halts_all_workers() {
    let analyzer = Arc::new(MockAnalyzer::new());
    let queue = queue_with(Arc::clone(&analyzer), 3, 20);
    queue.start().await;
    queue.stop().await;

    // Jobs submitted after stop stay Pending.
    let job_id = queue.submit(payload(1)).await;
    sleep(Duration::from_millis(100)).await;
    let job = queue.get(&job_id).await.unwrap();
    assert_eq!(job.status, JobStatus::Pending);
    assert_eq!(analyzer.call_count(), 0);
}
