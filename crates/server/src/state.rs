use std::path::PathBuf;
use std::sync::Arc;

use trafficscope_jobs::JobQueue;

use crate::grid::GridAnalyzer;
use crate::joblog::JobLogStore;

pub struct AppState {
    pub queue: Arc<JobQueue>,
    pub grid: Arc<GridAnalyzer>,
    pub job_log: JobLogStore,
    /// Base URL reported back to callers in derived screenshot links.
    pub public_base_url: Option<String>,
    /// Directory the `/static` routes serve screenshot artifacts from.
    pub static_dir: PathBuf,
}
