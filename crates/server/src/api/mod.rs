//! HTTP endpoint modules.
//!
//! `jobs` owns batch submission and the poll/cancel lifecycle; `health`
//! owns server and analyzer-grid readiness. Shared response envelopes
//! live here in mod.rs.

pub mod health;
pub mod jobs;

use serde::Serialize;

#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

pub use health::health;
pub use jobs::{analyze_batch, cancel_job, get_job};
