//! The work-unit contract: one location analysis.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use trafficscope_core::{AnalysisRequest, LocationReport};

#[derive(Debug, Error)]
pub enum AnalyzerError {
    #[error("analyzer unreachable: {0}")]
    Unreachable(String),

    #[error("analysis failed: {0}")]
    Analysis(String),

    #[error("analysis timed out after {0}s")]
    Timeout(u64),

    #[error("invalid analyzer response: {0}")]
    Parse(String),
}

/// Executes one location analysis. Implementations may be slow; the fan-out
/// controller bounds how many run concurrently per job and treats any error
/// as an ordinary per-location failure.
#[async_trait]
pub trait LocationAnalyzer: Send + Sync {
    async fn analyze(&self, request: &AnalysisRequest) -> Result<LocationReport, AnalyzerError>;
}

/// Adapter for synchronous, blocking analysis functions.
///
/// Runs the wrapped function on the blocking thread pool so a slow analysis
/// never stalls the worker tasks' own scheduling.
pub struct BlockingAnalyzer<F> {
    func: Arc<F>,
}

impl<F> BlockingAnalyzer<F>
where
    F: Fn(AnalysisRequest) -> Result<LocationReport, AnalyzerError> + Send + Sync + 'static,
{
    pub fn new(func: F) -> Self {
        Self { func: Arc::new(func) }
    }
}

#[async_trait]
impl<F> LocationAnalyzer for BlockingAnalyzer<F>
where
    F: Fn(AnalysisRequest) -> Result<LocationReport, AnalyzerError> + Send + Sync + 'static,
{
    async fn analyze(&self, request: &AnalysisRequest) -> Result<LocationReport, AnalyzerError> {
        let func = Arc::clone(&self.func);
        let request = request.clone();
        tokio::task::spawn_blocking(move || func(request))
            .await
            .map_err(|e| AnalyzerError::Analysis(format!("blocking analysis task died: {e}")))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn blocking_adapter_runs_function() {
        let analyzer = BlockingAnalyzer::new(|request: AnalysisRequest| {
            Ok(LocationReport {
                score: request.lat * 2.0,
                ..Default::default()
            })
        });
        let request = AnalysisRequest {
            lat: 2.5,
            lng: 0.0,
            storefront_direction: "north".into(),
            day: None,
            time: None,
            proxy: None,
        };
        let report = analyzer.analyze(&request).await.unwrap();
        assert_eq!(report.score, 5.0);
    }

    #[tokio::test]
    async fn blocking_adapter_propagates_errors() {
        let analyzer = BlockingAnalyzer::new(|_request: AnalysisRequest| {
            Err(AnalyzerError::Analysis("no traffic layer".into()))
        });
        let request = AnalysisRequest {
            lat: 0.0,
            lng: 0.0,
            storefront_direction: "north".into(),
            day: None,
            time: None,
            proxy: None,
        };
        let err = analyzer.analyze(&request).await.unwrap_err();
        assert!(err.to_string().contains("no traffic layer"));
    }
}
