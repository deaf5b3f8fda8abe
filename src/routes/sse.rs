use std::convert::Infallible;

use axum::{
    Router,
    extract::{Path, State},
    response::sse::Sse,
    routing::get,
};
use futures::Stream;
use uuid::Uuid;

use crate::{error::AppError, services::sse_service, state::SharedState};

#[utoipa::path(
    get,
    path = "/api/events",
    tag = "sse",
    responses((status = 200, description = "Board SSE stream", content_type = "text/event-stream", body = String))
)]
/// Stream board events (queue, match lifecycle, roster) to any client.
pub async fn board_stream(
    State(state): State<SharedState>,
) -> Result<Sse<impl Stream<Item = Result<axum::response::sse::Event, Infallible>>>, AppError> {
    Ok(sse_service::board_stream(&state).await?)
}

#[utoipa::path(
    get,
    path = "/api/events/scout/{user_id}",
    tag = "sse",
    params(("user_id" = Uuid, Path, description = "Scout this stream belongs to")),
    responses(
        (status = 200, description = "Scout SSE stream", content_type = "text/event-stream", body = String),
        (status = 404, description = "Scout is not registered")
    )
)]
/// Stream a scout's personal events on top of the board stream. Connecting
/// marks the scout online; disconnecting drops their queue entry.
pub async fn scout_stream(
    State(state): State<SharedState>,
    Path(user_id): Path<Uuid>,
) -> Result<Sse<impl Stream<Item = Result<axum::response::sse::Event, Infallible>>>, AppError> {
    Ok(sse_service::scout_stream(&state, user_id).await?)
}

/// Configure the SSE endpoints.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new()
        .route("/api/events", get(board_stream))
        .route("/api/events/scout/{user_id}", get(scout_stream))
}
