/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Match lifecycle and assignment fan-out.
pub mod match_service;
/// Volunteer queue membership and presence cleanup.
pub mod queue_service;
/// Scout roster management.
pub mod scout_service;
/// Per-scout scouting session control.
pub mod session_service;
/// Server-Sent Events message generation.
pub mod sse_events;
/// Server-Sent Events broadcasting service.
pub mod sse_service;
