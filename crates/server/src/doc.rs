//! OpenAPI documentation aggregator.
//!
//! Collects the `#[utoipa::path]`-annotated handlers and `ToSchema`-derived
//! types into a single OpenAPI spec, served via Scalar UI at `/docs`.

use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "trafficscope API",
        version = "0.1.0",
        description = "Batch storefront-traffic analysis: submit up to 20 locations per job, poll for aggregated scores and screenshot links.",
    ),
    tags(
        (name = "Jobs", description = "Batch submission, polling, and cancellation"),
        (name = "Health", description = "API and analyzer grid readiness"),
    ),
    paths(
        crate::api::jobs::analyze_batch,
        crate::api::jobs::get_job,
        crate::api::jobs::cancel_job,
        crate::api::health::health,
    )
)]
pub struct ApiDoc;
