use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for Scout Deck Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::scouts::register_scout,
        crate::routes::scouts::list_scouts,
        crate::routes::scouts::remove_scout,
        crate::routes::queue::join_queue,
        crate::routes::queue::leave_queue,
        crate::routes::queue::get_queue,
        crate::routes::matches::start_match,
        crate::routes::matches::end_match,
        crate::routes::matches::list_matches,
        crate::routes::matches::get_active_match,
        crate::routes::session::start_manual_session,
        crate::routes::session::advance_phase,
        crate::routes::session::set_timer,
        crate::routes::session::capture,
        crate::routes::session::cancel_session,
        crate::routes::session::submit_session,
        crate::routes::session::get_session,
        crate::routes::sse::board_stream,
        crate::routes::sse::scout_stream,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::scouts::RegisterScoutRequest,
            crate::dto::scouts::ScoutSummary,
            crate::dto::scouts::RosterResponse,
            crate::dto::queue::QueueMembershipRequest,
            crate::dto::queue::QueueSnapshot,
            crate::dto::matches::StartMatchRequest,
            crate::dto::matches::EndMatchRequest,
            crate::dto::matches::MatchSummary,
            crate::dto::matches::MatchListResponse,
            crate::dto::session::ManualStartRequest,
            crate::dto::session::AdvancePhaseRequest,
            crate::dto::session::TimerRequest,
            crate::dto::session::CaptureRequest,
            crate::dto::session::SessionView,
            crate::dto::session::CancelResponse,
            crate::dto::session::SubmitResponse,
            crate::dto::sse::Handshake,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "scouts", description = "Scout roster management"),
        (name = "queue", description = "Volunteer queue membership"),
        (name = "matches", description = "Match lifecycle and assignment fan-out"),
        (name = "session", description = "Per-scout scouting session control"),
        (name = "sse", description = "Server-sent events streams"),
    )
)]
pub struct ApiDoc;
