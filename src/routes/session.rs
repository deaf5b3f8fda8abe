use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use axum_valid::Valid;
use uuid::Uuid;

use crate::{
    dto::session::{
        AdvancePhaseRequest, CancelResponse, CaptureRequest, ManualStartRequest, SessionView,
        SubmitResponse, TimerRequest,
    },
    error::AppError,
    services::session_service,
    state::SharedState,
};

/// Routes controlling one scout's session, addressed by user id.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/api/session/{user_id}", get(get_session))
        .route("/api/session/{user_id}/start", post(start_manual_session))
        .route("/api/session/{user_id}/advance", post(advance_phase))
        .route("/api/session/{user_id}/timer", post(set_timer))
        .route("/api/session/{user_id}/capture", post(capture))
        .route("/api/session/{user_id}/cancel", post(cancel_session))
        .route("/api/session/{user_id}/submit", post(submit_session))
}

/// Start a session against a hand-typed team number.
#[utoipa::path(
    post,
    path = "/api/session/{user_id}/start",
    tag = "session",
    params(("user_id" = Uuid, Path, description = "Scout starting the session")),
    request_body = ManualStartRequest,
    responses(
        (status = 200, description = "Session started", body = SessionView),
        (status = 409, description = "A session is already running")
    )
)]
pub async fn start_manual_session(
    State(state): State<SharedState>,
    Path(user_id): Path<Uuid>,
    Valid(Json(payload)): Valid<Json<ManualStartRequest>>,
) -> Result<Json<SessionView>, AppError> {
    let view = session_service::start_manual(&state, user_id, payload).await?;
    Ok(Json(view))
}

/// Advance the session one phase forward.
#[utoipa::path(
    post,
    path = "/api/session/{user_id}/advance",
    tag = "session",
    params(("user_id" = Uuid, Path, description = "Scout advancing their session")),
    request_body = AdvancePhaseRequest,
    responses(
        (status = 200, description = "Session advanced", body = SessionView),
        (status = 409, description = "The session cannot advance to that phase")
    )
)]
pub async fn advance_phase(
    State(state): State<SharedState>,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<AdvancePhaseRequest>,
) -> Result<Json<SessionView>, AppError> {
    let view = session_service::advance(&state, user_id, payload).await?;
    Ok(Json(view))
}

/// Pause or resume the session countdown.
#[utoipa::path(
    post,
    path = "/api/session/{user_id}/timer",
    tag = "session",
    params(("user_id" = Uuid, Path, description = "Scout driving the timer")),
    request_body = TimerRequest,
    responses(
        (status = 200, description = "Timer updated", body = SessionView)
    )
)]
pub async fn set_timer(
    State(state): State<SharedState>,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<TimerRequest>,
) -> Result<Json<SessionView>, AppError> {
    let view = session_service::set_timer(&state, user_id, payload).await?;
    Ok(Json(view))
}

/// Apply a capture edit to the current phase's fields.
#[utoipa::path(
    post,
    path = "/api/session/{user_id}/capture",
    tag = "session",
    params(("user_id" = Uuid, Path, description = "Scout recording the observation")),
    request_body = CaptureRequest,
    responses(
        (status = 200, description = "Capture updated", body = SessionView),
        (status = 409, description = "The edit does not apply to the current phase")
    )
)]
pub async fn capture(
    State(state): State<SharedState>,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<CaptureRequest>,
) -> Result<Json<SessionView>, AppError> {
    let view = session_service::capture(&state, user_id, payload).await?;
    Ok(Json(view))
}

/// Register one cancel click; a second click inside the confirmation window
/// discards the session.
#[utoipa::path(
    post,
    path = "/api/session/{user_id}/cancel",
    tag = "session",
    params(("user_id" = Uuid, Path, description = "Scout cancelling their session")),
    responses(
        (status = 200, description = "Cancel armed or session discarded", body = CancelResponse),
        (status = 409, description = "No session to cancel")
    )
)]
pub async fn cancel_session(
    State(state): State<SharedState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<CancelResponse>, AppError> {
    let response = session_service::cancel(&state, user_id).await?;
    Ok(Json(response))
}

/// Submit the completed session's capture data.
#[utoipa::path(
    post,
    path = "/api/session/{user_id}/submit",
    tag = "session",
    params(("user_id" = Uuid, Path, description = "Scout submitting their record")),
    responses(
        (status = 200, description = "Record submitted", body = SubmitResponse),
        (status = 409, description = "The session is not complete"),
        (status = 503, description = "The store write failed; the session is kept for a retry")
    )
)]
pub async fn submit_session(
    State(state): State<SharedState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<SubmitResponse>, AppError> {
    let response = session_service::submit(&state, user_id).await?;
    Ok(Json(response))
}

/// Retrieve a scout's current session snapshot.
#[utoipa::path(
    get,
    path = "/api/session/{user_id}",
    tag = "session",
    params(("user_id" = Uuid, Path, description = "Scout whose session to read")),
    responses(
        (status = 200, description = "Session snapshot", body = SessionView)
    )
)]
pub async fn get_session(
    State(state): State<SharedState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<SessionView>, AppError> {
    let view = session_service::session_view(&state, user_id).await?;
    Ok(Json(view))
}
