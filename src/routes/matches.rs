use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{delete, get, post},
};
use axum_valid::Valid;
use uuid::Uuid;

use crate::{
    dto::matches::{EndMatchRequest, MatchListResponse, MatchSummary, StartMatchRequest},
    error::AppError,
    services::match_service,
    state::SharedState,
};

/// Routes driving the match lifecycle.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/api/matches", post(start_match).get(list_matches))
        .route("/api/matches/active", get(get_active_match))
        .route("/api/matches/{match_id}", delete(end_match))
}

/// Start a match, assigning the queue's head scouts to the given teams.
#[utoipa::path(
    post,
    path = "/api/matches",
    tag = "matches",
    request_body = StartMatchRequest,
    responses(
        (status = 200, description = "Match started", body = MatchSummary),
        (status = 400, description = "Malformed or miscounted team numbers"),
        (status = 401, description = "Requester is not a lead"),
        (status = 409, description = "A match is already active")
    )
)]
pub async fn start_match(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<StartMatchRequest>>,
) -> Result<Json<MatchSummary>, AppError> {
    let summary = match_service::start_match(&state, payload).await?;
    Ok(Json(summary))
}

/// End the given match early, releasing its unsubmitted assignments.
#[utoipa::path(
    delete,
    path = "/api/matches/{match_id}",
    tag = "matches",
    params(
        ("match_id" = Uuid, Path, description = "Identifier of the match to end"),
        ("user_id" = Uuid, Query, description = "Lead requesting the end")
    ),
    responses(
        (status = 200, description = "Match ended", body = MatchSummary),
        (status = 401, description = "Requester may not end this match")
    )
)]
pub async fn end_match(
    State(state): State<SharedState>,
    Path(match_id): Path<Uuid>,
    Query(payload): Query<EndMatchRequest>,
) -> Result<Json<MatchSummary>, AppError> {
    let summary = match_service::end_match(&state, match_id, payload.user_id).await?;
    Ok(Json(summary))
}

/// Retrieve recent matches with their participant records, newest first.
#[utoipa::path(
    get,
    path = "/api/matches",
    tag = "matches",
    responses(
        (status = 200, description = "Recent matches", body = MatchListResponse)
    )
)]
pub async fn list_matches(
    State(state): State<SharedState>,
) -> Result<Json<MatchListResponse>, AppError> {
    Ok(Json(match_service::recent_matches(&state).await?))
}

/// Retrieve the active match, or 404 when none is running.
#[utoipa::path(
    get,
    path = "/api/matches/active",
    tag = "matches",
    responses(
        (status = 200, description = "Active match", body = MatchSummary),
        (status = 404, description = "No match is active")
    )
)]
pub async fn get_active_match(
    State(state): State<SharedState>,
) -> Result<Json<MatchSummary>, AppError> {
    let summary = match_service::active_match(&state)
        .await?
        .ok_or_else(|| AppError::NotFound("no active match".into()))?;
    Ok(Json(summary))
}
