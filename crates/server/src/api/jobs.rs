//! Batch submission and the poll/cancel job lifecycle.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use trafficscope_core::{Location, DEFAULT_STOREFRONT_DIRECTION};
use trafficscope_jobs::{JobPayload, JobRecord, JobResult, JobStatus, MAX_LOCATIONS_PER_JOB};

use crate::api::ErrorResponse;
use crate::joblog::TerminalJobLog;
use crate::state::AppState;

// ── Request / response types ─────────────────────────────────────

#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
pub struct LocationItem {
    pub lat: f64,
    pub lng: f64,
    #[serde(default)]
    pub storefront_direction: Option<String>,
    #[serde(default)]
    pub day: Option<String>,
    #[serde(default)]
    pub time: Option<String>,
}

impl LocationItem {
    fn into_location(self) -> Location {
        Location {
            lat: self.lat,
            lng: self.lng,
            storefront_direction: self
                .storefront_direction
                .unwrap_or_else(|| DEFAULT_STOREFRONT_DIRECTION.to_string()),
            day: self.day,
            time: self.time,
        }
    }
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct BatchAnalyzeRequest {
    pub locations: Vec<LocationItem>,
    #[serde(default)]
    pub proxy: Option<String>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct SubmitResponse {
    pub job_id: String,
    pub status: &'static str,
    pub locations_count: usize,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct JobStatusResponse {
    pub job_id: String,
    pub status: String,
    pub completed: usize,
    pub locations_count: usize,
    #[schema(value_type = Object)]
    pub result: JobResult,
    pub error: Option<String>,
}

impl JobStatusResponse {
    fn from_record(record: &JobRecord) -> Self {
        Self {
            job_id: record.id.clone(),
            status: record.status.as_str().to_string(),
            completed: record.completed,
            locations_count: record.locations_count(),
            result: record.result.clone(),
            error: record.error.clone(),
        }
    }

    fn from_log(log: &TerminalJobLog) -> Self {
        Self {
            job_id: log.job_id.clone(),
            status: log.status.as_str().to_string(),
            completed: log.completed,
            locations_count: log.locations_count,
            result: log.result.clone(),
            error: log.error.clone(),
        }
    }
}

// ── Handlers ─────────────────────────────────────────────────────

/// Submit a batch of up to 20 locations. Returns the job id immediately;
/// poll `/job/{job_id}` for progress and results.
#[utoipa::path(
    post,
    path = "/analyze-batch",
    tag = "Jobs",
    request_body = BatchAnalyzeRequest,
    responses(
        (status = 200, description = "Job queued", body = SubmitResponse),
        (status = 400, description = "Invalid batch", body = ErrorResponse)
    )
)]
pub async fn analyze_batch(
    State(state): State<Arc<AppState>>,
    Json(request): Json<BatchAnalyzeRequest>,
) -> Result<Json<SubmitResponse>, (StatusCode, Json<ErrorResponse>)> {
    if request.locations.is_empty() {
        return Err(bad_request("No locations provided"));
    }
    if request.locations.len() > MAX_LOCATIONS_PER_JOB {
        return Err(bad_request("Max 20 locations per request"));
    }

    let locations_count = request.locations.len();
    let payload = JobPayload {
        locations: request
            .locations
            .into_iter()
            .map(LocationItem::into_location)
            .collect(),
        proxy: request.proxy,
        request_base_url: state.public_base_url.clone(),
    };

    let job_id = state.queue.submit(payload).await;
    info!("Queued job {} with {} location(s)", job_id, locations_count);

    Ok(Json(SubmitResponse {
        job_id,
        status: JobStatus::Pending.as_str(),
        locations_count,
    }))
}

/// Poll a job. While the job is pending or running this returns a progress
/// snapshot. The first poll that observes a terminal state logs the job to
/// the durable store, drops it from the queue, and returns the final state;
/// later polls are served from the store.
#[utoipa::path(
    get,
    path = "/job/{job_id}",
    tag = "Jobs",
    params(("job_id" = String, Path, description = "Job identifier")),
    responses(
        (status = 200, description = "Job status or final result", body = JobStatusResponse),
        (status = 404, description = "Unknown job"),
        (status = 500, description = "Job execution failed")
    )
)]
pub async fn get_job(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<String>,
) -> Result<Json<JobStatusResponse>, (StatusCode, Json<serde_json::Value>)> {
    let Some(job) = state.queue.get(&job_id).await else {
        // Already consumed and removed, or never known: try the durable log.
        return match state.job_log.load(&job_id) {
            Ok(Some(logged)) => Ok(Json(JobStatusResponse::from_log(&logged))),
            Ok(None) => Err(not_found()),
            Err(e) => {
                warn!("Job log read failed for {}: {}", job_id, e);
                Err(not_found())
            }
        };
    };

    let response = JobStatusResponse::from_record(&job);
    if !job.status.is_terminal() {
        return Ok(Json(response));
    }

    // Terminal: persist at most once, then drop the in-memory record.
    if state.queue.mark_logged(&job_id).await {
        if let Err(e) = state.job_log.save(&TerminalJobLog::from_record(&job)) {
            warn!("Job log write failed for {}: {}", job_id, e);
        }
    }
    state.queue.remove(&job_id).await;

    if job.status == JobStatus::Failed {
        return Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({
                "message": "Job execution failed",
                "details": response,
            })),
        ));
    }

    Ok(Json(response))
}

/// Request cancellation of a job. Best-effort: the job is reported canceled
/// immediately; analyses already in flight finish on their own.
#[utoipa::path(
    post,
    path = "/job/{job_id}/cancel",
    tag = "Jobs",
    params(("job_id" = String, Path, description = "Job identifier")),
    responses(
        (status = 200, description = "Job after cancellation", body = JobStatusResponse),
        (status = 404, description = "Unknown job")
    )
)]
pub async fn cancel_job(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<String>,
) -> Result<Json<JobStatusResponse>, (StatusCode, Json<serde_json::Value>)> {
    match state.queue.cancel(&job_id).await {
        Some(job) => Ok(Json(JobStatusResponse::from_record(&job))),
        None => Err(not_found()),
    }
}

fn bad_request(message: &str) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
}

fn not_found() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({"error": "Job not found"})),
    )
}
