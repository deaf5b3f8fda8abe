use serde::Serialize;
use utoipa::ToSchema;

/// Simple health response returned by the `/api/healthz` route.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Health status ("ok" or "degraded").
    pub status: String,
    /// Whether the document store answered the probe.
    pub store: bool,
}

impl HealthResponse {
    /// Create a health response indicating the system is operational.
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
            store: true,
        }
    }

    /// Create a health response indicating the store probe failed.
    pub fn degraded() -> Self {
        Self {
            status: "degraded".to_string(),
            store: false,
        }
    }
}
