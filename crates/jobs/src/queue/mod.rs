//! Job queue runtime -- admission, worker pool, and per-job fan-out.
//!
//! Split into focused submodules:
//! - `core`: JobQueue struct, configuration, and the public facade
//! - `worker`: the long-lived worker loop pulling jobs off the admission queue
//! - `fanout`: per-job location fan-out and terminal-status finalization

mod core;
mod fanout;
mod worker;
#[cfg(test)]
mod tests;

pub use self::core::{JobQueue, JobQueueConfig};
