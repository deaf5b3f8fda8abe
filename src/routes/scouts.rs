use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get},
};
use axum_valid::Valid;
use uuid::Uuid;

use crate::{
    dto::scouts::{RegisterScoutRequest, RosterResponse, ScoutSummary},
    error::AppError,
    services::scout_service,
    state::SharedState,
};

/// Routes managing the scout roster.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/api/scouts", get(list_scouts).post(register_scout))
        .route("/api/scouts/{user_id}", delete(remove_scout))
}

/// Register a scout and announce them on the board stream.
#[utoipa::path(
    post,
    path = "/api/scouts",
    tag = "scouts",
    request_body = RegisterScoutRequest,
    responses(
        (status = 200, description = "Scout registered", body = ScoutSummary)
    )
)]
pub async fn register_scout(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<RegisterScoutRequest>>,
) -> Result<Json<ScoutSummary>, AppError> {
    let summary = scout_service::register(&state, payload).await?;
    Ok(Json(summary))
}

/// Retrieve every registered scout with their presence flags.
#[utoipa::path(
    get,
    path = "/api/scouts",
    tag = "scouts",
    responses(
        (status = 200, description = "Scout roster", body = RosterResponse)
    )
)]
pub async fn list_scouts(
    State(state): State<SharedState>,
) -> Result<Json<RosterResponse>, AppError> {
    Ok(Json(scout_service::roster(&state).await?))
}

/// Remove a scout, cleaning up their queue entry, assignment, and session.
#[utoipa::path(
    delete,
    path = "/api/scouts/{user_id}",
    tag = "scouts",
    params(("user_id" = Uuid, Path, description = "Identifier of the scout to remove")),
    responses((status = 204, description = "Scout removed"))
)]
pub async fn remove_scout(
    State(state): State<SharedState>,
    Path(user_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    scout_service::remove(&state, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
