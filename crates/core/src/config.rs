use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

fn env_u16(key: &str, default: u16) -> u16 {
    env_opt(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    env_opt(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_usize(key: &str, default: usize) -> usize {
    env_opt(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub queue: QueueConfig,
    pub grid: GridConfig,
    pub storage: StorageConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    pub fn from_env() -> Self {
        Self {
            server: ServerConfig::from_env(),
            queue: QueueConfig::from_env(),
            grid: GridConfig::from_env(),
            storage: StorageConfig::from_env(),
        }
    }

    /// Print a redacted summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded:");
        tracing::info!("  server:   host={}, port={}", self.server.host, self.server.port);
        tracing::info!(
            "  server:   public_base_url={}, static_dir={}",
            self.server.public_base_url.as_deref().unwrap_or("(none)"),
            self.server.static_dir.display()
        );
        tracing::info!(
            "  queue:    max_jobs={}, per_job_concurrency={}",
            self.queue.max_jobs,
            self.queue.per_job_concurrency
        );
        tracing::info!(
            "  grid:     url={}, timeout={}s, proxy={}",
            self.grid.url,
            self.grid.timeout_secs,
            if self.grid.proxy.is_some() { "(set)" } else { "(none)" }
        );
        tracing::info!("  storage:  data_dir={}", self.storage.data_dir.display());
    }
}

// ── Server ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Absolute base URL prepended to derived screenshot links.
    /// When unset, responses omit screenshot URLs.
    pub public_base_url: Option<String>,
    /// Root directory that screenshot artifacts are served from.
    pub static_dir: PathBuf,
}

impl ServerConfig {
    fn from_env() -> Self {
        Self {
            host: env_or("HOST", "0.0.0.0"),
            port: env_u16("PORT", 8000),
            public_base_url: env_opt("PUBLIC_BASE_URL"),
            static_dir: PathBuf::from(env_or("STATIC_DIR", "static")),
        }
    }
}

// ── Job queue ─────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Number of background job workers (how many jobs run concurrently).
    pub max_jobs: usize,
    /// How many locations inside a single job run concurrently.
    pub per_job_concurrency: usize,
}

impl QueueConfig {
    fn from_env() -> Self {
        Self {
            max_jobs: env_usize("JOBQUEUE_MAX_JOBS", 2),
            per_job_concurrency: env_usize("JOBQUEUE_PER_JOB_CONCURRENCY", 20),
        }
    }
}

// ── Analyzer grid ─────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridConfig {
    /// Base URL of the remote analyzer grid.
    pub url: String,
    /// Per-location analysis timeout. A single analysis drives a browser
    /// session end to end, so this is generous by default.
    pub timeout_secs: u64,
    /// Default proxy hint forwarded to the grid when a job supplies none.
    pub proxy: Option<String>,
}

impl GridConfig {
    fn from_env() -> Self {
        Self {
            url: env_or("ANALYZER_GRID_URL", "http://selenium-hub:4444"),
            timeout_secs: env_u64("ANALYZER_TIMEOUT_SECS", 300),
            proxy: env_opt("ANALYZER_PROXY"),
        }
    }
}

// ── Storage ───────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
}

impl StorageConfig {
    fn from_env() -> Self {
        Self {
            data_dir: PathBuf::from(env_or("DATA_DIR", "data")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queue_defaults() {
        let config = QueueConfig {
            max_jobs: env_usize("TRAFFICSCOPE_TEST_UNSET_A", 2),
            per_job_concurrency: env_usize("TRAFFICSCOPE_TEST_UNSET_B", 20),
        };
        assert_eq!(config.max_jobs, 2);
        assert_eq!(config.per_job_concurrency, 20);
    }

    #[test]
    fn env_helpers_fall_back() {
        assert_eq!(env_or("TRAFFICSCOPE_TEST_UNSET_C", "fallback"), "fallback");
        assert_eq!(env_opt("TRAFFICSCOPE_TEST_UNSET_D"), None);
        assert_eq!(env_u16("TRAFFICSCOPE_TEST_UNSET_E", 8000), 8000);
    }
}
