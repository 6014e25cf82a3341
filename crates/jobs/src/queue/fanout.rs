use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

use trafficscope_core::{AnalysisRequest, Location, LocationReport};

use crate::analyzer::LocationAnalyzer;
use crate::links::derive_screenshot_url;
use crate::record::{JobPayload, JobStatus, MAX_LOCATIONS_PER_JOB};

use super::core::SharedJobs;

/// Everything a worker needs to process jobs. Cloned per worker at start.
pub(super) struct WorkerContext {
    pub jobs: SharedJobs,
    pub analyzer: Arc<dyn LocationAnalyzer>,
    pub per_job_concurrency: usize,
    pub static_root: PathBuf,
}

/// Outcome slot for one location: `None` until the location finishes (or
/// when it was skipped by cancellation), then the report or the recorded
/// failure message.
type LocationSlot = Option<Result<LocationReport, String>>;

/// Has cancellation been requested for this job?
async fn cancel_requested(jobs: &SharedJobs, job_id: &str) -> bool {
    jobs.read()
        .await
        .get(job_id)
        .map(|job| job.cancel_requested)
        .unwrap_or(true)
}

/// Process one claimed job end to end.
///
/// The terminal-status decision always runs, whatever happened during the
/// fan-out, so a non-canceled job can never be left hanging in `Running`.
pub(super) async fn process_job(ctx: &WorkerContext, job_id: &str) {
    // Claim. A terminal state is never exited, so a job canceled while it
    // was still queued is skipped rather than moved to Running.
    let payload = {
        let mut jobs = ctx.jobs.write().await;
        let Some(job) = jobs.get_mut(job_id) else {
            debug!("Job {} vanished before processing", job_id);
            return;
        };
        if job.cancel_requested {
            debug!("Job {} was canceled while queued; skipping", job_id);
            return;
        }
        job.status = JobStatus::Running;
        job.touch();
        job.payload.clone()
    };

    // Defensive cap even when the submitting layer already enforced it.
    let locations: Vec<Location> = payload
        .locations
        .iter()
        .take(MAX_LOCATIONS_PER_JOB)
        .cloned()
        .collect();
    debug!("Job {} running with {} location(s)", job_id, locations.len());

    let slots = run_locations(ctx, job_id, &payload, &locations).await;

    finalize(ctx, job_id, &locations, &slots).await;
}

/// Fan the job's locations out to at most `per_job_concurrency` concurrent
/// analyses and collect their outcomes.
async fn run_locations(
    ctx: &WorkerContext,
    job_id: &str,
    payload: &JobPayload,
    locations: &[Location],
) -> Vec<LocationSlot> {
    let mut slots: Vec<LocationSlot> = vec![None; locations.len()];
    let gate = Arc::new(Semaphore::new(ctx.per_job_concurrency));
    let mut tasks = Vec::with_capacity(locations.len());

    for (idx, location) in locations.iter().enumerate() {
        if cancel_requested(&ctx.jobs, job_id).await {
            debug!("Job {}: cancel observed, stopping location launch", job_id);
            break;
        }
        let gate = Arc::clone(&gate);
        let jobs = Arc::clone(&ctx.jobs);
        let analyzer = Arc::clone(&ctx.analyzer);
        let request = AnalysisRequest::new(location, payload.proxy.clone());
        let id = job_id.to_string();

        tasks.push((
            idx,
            tokio::spawn(async move {
                if cancel_requested(&jobs, &id).await {
                    return None;
                }
                let _permit = match gate.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => return None,
                };
                // Re-check after waiting at the gate: bounds how many
                // analyses start after a cancel request.
                if cancel_requested(&jobs, &id).await {
                    return None;
                }
                match analyzer.analyze(&request).await {
                    Ok(report) => Some(Ok(report)),
                    Err(e) => {
                        let msg = format!("Location analysis failed: {}", e);
                        error!("Job {}: failed location {}: {}", id, idx, msg);
                        let mut jobs = jobs.write().await;
                        if let Some(job) = jobs.get_mut(&id) {
                            job.failure += 1;
                            job.touch();
                        }
                        Some(Err(msg))
                    }
                }
            }),
        ));
    }

    // Collect in submission order. The tasks themselves still complete in
    // any order under the gate; in-flight ones keep running if we break on
    // cancellation, and their results are simply discarded.
    for (idx, task) in tasks {
        if cancel_requested(&ctx.jobs, job_id).await {
            debug!("Job {}: cancel observed, stopping result collection", job_id);
            break;
        }
        match task.await {
            Ok(Some(Ok(mut report))) => {
                report.screenshot_url = resolve_screenshot_url(ctx, job_id, payload, &report);
                slots[idx] = Some(Ok(report));
            }
            Ok(Some(Err(msg))) => {
                slots[idx] = Some(Err(msg));
            }
            // Skipped by cancellation; still counts as completed below.
            Ok(None) => {}
            Err(e) => {
                error!("Job {}: location task {} died: {}", job_id, idx, e);
            }
        }
        // Exactly one completion tick per awaited location, success or not.
        let mut jobs = ctx.jobs.write().await;
        if let Some(job) = jobs.get_mut(job_id) {
            job.completed += 1;
            job.touch();
        }
    }

    slots
}

/// Decide the terminal status. Runs for every non-canceled job; cancellation
/// wins and is never overwritten.
async fn finalize(ctx: &WorkerContext, job_id: &str, locations: &[Location], slots: &[LocationSlot]) {
    let mut jobs = ctx.jobs.write().await;
    let Some(job) = jobs.get_mut(job_id) else {
        return;
    };

    if !job.cancel_requested {
        job.result.locations = slots
            .iter()
            .filter_map(|slot| match slot {
                Some(Ok(report)) => Some(report.clone()),
                _ => None,
            })
            .collect();
        job.result.count = job.result.locations.len();

        if !locations.is_empty() && job.failure == locations.len() {
            let messages: Vec<&str> = slots
                .iter()
                .filter_map(|slot| match slot {
                    Some(Err(msg)) => Some(msg.as_str()),
                    _ => None,
                })
                .take(3)
                .collect();
            job.error = Some(format!(
                "All {} location(s) failed. Errors: {}",
                locations.len(),
                messages.join("; ")
            ));
            job.status = JobStatus::Failed;
            warn!("Job {} failed: all {} location(s) failed", job_id, locations.len());
        } else {
            job.status = JobStatus::Done;
            info!(
                "Job {} done: {}/{} location(s) succeeded",
                job_id,
                job.result.count,
                locations.len()
            );
        }
    }

    job.touch();
}

fn resolve_screenshot_url(
    ctx: &WorkerContext,
    job_id: &str,
    payload: &JobPayload,
    report: &LocationReport,
) -> Option<String> {
    let artifact = report.artifact_path()?;
    let url = derive_screenshot_url(
        payload.request_base_url.as_deref(),
        &ctx.static_root,
        artifact,
    );
    if url.is_none() {
        warn!(
            "Job {}: could not derive screenshot URL for '{}'",
            job_id, artifact
        );
    }
    url
}
