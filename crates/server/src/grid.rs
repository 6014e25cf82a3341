//! Remote analyzer grid client.
//!
//! The actual location analysis (browser automation, screenshot capture,
//! traffic scoring) runs on a separate analyzer grid. This client forwards
//! one analysis request per call and parses the grid's report back.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info};

use trafficscope_core::config::GridConfig;
use trafficscope_core::{AnalysisRequest, LocationReport};
use trafficscope_jobs::{AnalyzerError, LocationAnalyzer};

/// Readiness snapshot of the analyzer grid, for the health endpoint.
#[derive(Debug, Clone, serde::Serialize)]
pub struct GridStatus {
    pub ready: bool,
    pub nodes: usize,
}

pub struct GridAnalyzer {
    client: reqwest::Client,
    url: String,
    timeout_secs: u64,
    default_proxy: Option<String>,
}

impl GridAnalyzer {
    pub fn new(config: &GridConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: config.url.trim_end_matches('/').to_string(),
            timeout_secs: config.timeout_secs,
            default_proxy: config.proxy.clone(),
        }
    }

    /// Query the grid's `/status` endpoint.
    pub async fn status(&self) -> Result<GridStatus, AnalyzerError> {
        let url = format!("{}/status", self.url);
        let response = self
            .client
            .get(&url)
            .timeout(Duration::from_secs(10))
            .send()
            .await
            .map_err(|e| AnalyzerError::Unreachable(e.to_string()))?;

        let status = response.status().as_u16();
        if status != 200 {
            return Err(AnalyzerError::Unreachable(format!("HTTP {}", status)));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| AnalyzerError::Parse(e.to_string()))?;
        Ok(Self::parse_status(&body))
    }

    fn parse_status(body: &serde_json::Value) -> GridStatus {
        GridStatus {
            ready: body["value"]["ready"].as_bool().unwrap_or(false),
            nodes: body["value"]["nodes"].as_array().map(|n| n.len()).unwrap_or(0),
        }
    }
}

#[async_trait]
impl LocationAnalyzer for GridAnalyzer {
    async fn analyze(&self, request: &AnalysisRequest) -> Result<LocationReport, AnalyzerError> {
        let url = format!("{}/analyze", self.url);
        let mut request = request.clone();
        if request.proxy.is_none() {
            request.proxy = self.default_proxy.clone();
        }

        debug!("Grid analysis request to {} for ({}, {})", url, request.lat, request.lng);

        let response = self
            .client
            .post(&url)
            .json(&request)
            .timeout(Duration::from_secs(self.timeout_secs))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AnalyzerError::Timeout(self.timeout_secs)
                } else {
                    AnalyzerError::Unreachable(e.to_string())
                }
            })?;

        let status = response.status().as_u16();
        if status != 200 {
            let body = response.text().await.unwrap_or_default();
            return Err(AnalyzerError::Analysis(format!("grid returned HTTP {}: {}", status, body)));
        }

        let report: LocationReport = response
            .json()
            .await
            .map_err(|e| AnalyzerError::Parse(e.to_string()))?;

        info!(
            "Completed analysis for ({}, {}): score {}",
            request.lat, request.lng, report.score
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_grid_status_body() {
        let body = serde_json::json!({
            "value": {
                "ready": true,
                "nodes": [{"id": "a"}, {"id": "b"}, {"id": "c"}]
            }
        });
        let status = GridAnalyzer::parse_status(&body);
        assert!(status.ready);
        assert_eq!(status.nodes, 3);
    }

    #[test]
    fn malformed_status_body_reads_not_ready() {
        let status = GridAnalyzer::parse_status(&serde_json::json!({"unexpected": 1}));
        assert!(!status.ready);
        assert_eq!(status.nodes, 0);
    }
}
