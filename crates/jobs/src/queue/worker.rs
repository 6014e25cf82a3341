use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};
use tokio::time::timeout;
use tracing::debug;

use super::fanout::{process_job, WorkerContext};

/// How long a worker waits on the admission queue before re-checking the
/// stop flag.
const RECV_TIMEOUT: Duration = Duration::from_secs(1);

/// Long-lived worker loop. Pulls one job id at a time off the admission
/// queue and processes it to completion before pulling the next, which is
/// what bounds system-wide job concurrency to the worker count.
pub(super) async fn run_worker(
    index: usize,
    ctx: WorkerContext,
    queue_rx: Arc<Mutex<mpsc::UnboundedReceiver<String>>>,
    running: Arc<AtomicBool>,
) {
    debug!("Job worker {} started", index);
    while running.load(Ordering::Relaxed) {
        let next = {
            let mut rx = queue_rx.lock().await;
            timeout(RECV_TIMEOUT, rx.recv()).await
        };
        match next {
            Ok(Some(job_id)) => process_job(&ctx, &job_id).await,
            // Channel closed: the queue itself is gone.
            Ok(None) => break,
            // Poll timeout: loop around and observe the stop flag.
            Err(_) => continue,
        }
    }
    debug!("Job worker {} stopped", index);
}
