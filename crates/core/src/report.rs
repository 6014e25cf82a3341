//! Analyzer output for a single location.

use serde::{Deserialize, Serialize};

/// Result of one location analysis, as returned by the work-unit executor.
///
/// Only `score` is guaranteed; everything else depends on which analysis
/// method produced the report. Analyzer-specific fields (zone breakdowns,
/// pixel distributions, ...) ride along in `details`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LocationReport {
    pub score: f64,
    /// Analysis method identifier (e.g. "google_maps_screenshot").
    #[serde(default)]
    pub method: Option<String>,
    /// "live" or "typical", depending on what traffic data was available.
    #[serde(default)]
    pub traffic_type: Option<String>,
    /// Path of the captured screenshot on the analyzer's static volume.
    #[serde(default)]
    pub screenshot_path: Option<String>,
    /// Path of the pin-annotated variant, when one was produced.
    #[serde(default)]
    pub pinned_screenshot_path: Option<String>,
    /// Caller-facing screenshot link, derived by the job controller.
    #[serde(default)]
    pub screenshot_url: Option<String>,
    #[serde(flatten)]
    pub details: serde_json::Map<String, serde_json::Value>,
}

impl LocationReport {
    /// The artifact to expose to callers: the plain screenshot if present,
    /// otherwise the pinned variant.
    pub fn artifact_path(&self) -> Option<&str> {
        self.screenshot_path
            .as_deref()
            .or(self.pinned_screenshot_path.as_deref())
    }
}
