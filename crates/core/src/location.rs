//! Location inputs as submitted by callers.

use serde::{Deserialize, Serialize};

/// Direction used when a caller does not say which way the storefront faces.
pub const DEFAULT_STOREFRONT_DIRECTION: &str = "north";

fn default_direction() -> String {
    DEFAULT_STOREFRONT_DIRECTION.to_string()
}

/// One location inside a batch request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lng: f64,
    /// Compass direction the storefront faces (e.g. "north", "ne").
    #[serde(default = "default_direction")]
    pub storefront_direction: String,
    /// Day of week for historical traffic (e.g. "Monday").
    #[serde(default)]
    pub day: Option<String>,
    /// Target time of day for historical traffic (e.g. "6:00PM").
    #[serde(default)]
    pub time: Option<String>,
}

/// Everything the work-unit executor needs for a single location analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub lat: f64,
    pub lng: f64,
    pub storefront_direction: String,
    pub day: Option<String>,
    pub time: Option<String>,
    /// Proxy hint forwarded to the analyzer, from the job payload.
    pub proxy: Option<String>,
}

impl AnalysisRequest {
    pub fn new(location: &Location, proxy: Option<String>) -> Self {
        Self {
            lat: location.lat,
            lng: location.lng,
            storefront_direction: location.storefront_direction.clone(),
            day: location.day.clone(),
            time: location.time.clone(),
            proxy,
        }
    }
}
