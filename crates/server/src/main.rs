mod api;
mod doc;
mod grid;
mod joblog;
mod router;
mod state;

use std::sync::Arc;

use tracing::info;

use trafficscope_jobs::{JobQueue, JobQueueConfig};

use crate::grid::GridAnalyzer;
use crate::joblog::JobLogStore;
use crate::state::AppState;

fn load_config() -> trafficscope_core::Config {
    trafficscope_core::config::load_dotenv();
    trafficscope_core::Config::from_env()
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .init();

    let config = load_config();
    config.log_summary();

    std::fs::create_dir_all(&config.server.static_dir)?;

    let grid = Arc::new(GridAnalyzer::new(&config.grid));
    let analyzer: Arc<dyn trafficscope_jobs::LocationAnalyzer> = grid.clone();
    let queue = Arc::new(JobQueue::new(
        analyzer,
        JobQueueConfig {
            max_jobs: config.queue.max_jobs,
            per_job_concurrency: config.queue.per_job_concurrency,
            static_root: config.server.static_dir.clone(),
        },
    ));
    queue.start().await;
    info!("Job queue started");

    let job_log = JobLogStore::new(config.storage.data_dir.join("jobs"))?;

    let state = Arc::new(AppState {
        queue: Arc::clone(&queue),
        grid,
        job_log,
        public_base_url: config.server.public_base_url.clone(),
        static_dir: config.server.static_dir.clone(),
    });
    let app = router::build_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutting down...");
    queue.stop().await;
    info!("Cleanup completed");
    Ok(())
}
