use tracing::warn;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Report liveness together with the store's reachability.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    match state.store().health_check().await {
        Ok(()) => HealthResponse::ok(),
        Err(err) => {
            warn!(error = %err, "store health check failed");
            HealthResponse::degraded()
        }
    }
}
