use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};

use crate::{
    dto::queue::{QueueMembershipRequest, QueueSnapshot},
    error::AppError,
    services::queue_service,
    state::SharedState,
};

/// Routes handling volunteer queue membership.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/api/queue/join", post(join_queue))
        .route("/api/queue/leave", post(leave_queue))
        .route("/api/queue", get(get_queue))
}

/// Append a scout to the queue tail. Joining twice is a no-op.
#[utoipa::path(
    post,
    path = "/api/queue/join",
    tag = "queue",
    request_body = QueueMembershipRequest,
    responses(
        (status = 200, description = "Queue after the join", body = QueueSnapshot)
    )
)]
pub async fn join_queue(
    State(state): State<SharedState>,
    Json(payload): Json<QueueMembershipRequest>,
) -> Result<Json<QueueSnapshot>, AppError> {
    Ok(Json(queue_service::join(&state, payload.user_id).await?))
}

/// Drop a scout's queue entry. Leaving while not queued is a no-op.
#[utoipa::path(
    post,
    path = "/api/queue/leave",
    tag = "queue",
    request_body = QueueMembershipRequest,
    responses(
        (status = 200, description = "Queue after the leave", body = QueueSnapshot)
    )
)]
pub async fn leave_queue(
    State(state): State<SharedState>,
    Json(payload): Json<QueueMembershipRequest>,
) -> Result<Json<QueueSnapshot>, AppError> {
    Ok(Json(queue_service::leave(&state, payload.user_id).await?))
}

/// Retrieve the ordered queue, head first.
#[utoipa::path(
    get,
    path = "/api/queue",
    tag = "queue",
    responses(
        (status = 200, description = "Current queue", body = QueueSnapshot)
    )
)]
pub async fn get_queue(State(state): State<SharedState>) -> Result<Json<QueueSnapshot>, AppError> {
    Ok(Json(queue_service::snapshot(&state).await?))
}
