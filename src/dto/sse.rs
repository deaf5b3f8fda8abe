use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::dto::{
    matches::MatchSummary, queue::QueueSnapshot, scouts::ScoutSummary, session::SessionView,
};

#[derive(Clone, Debug)]
/// Dispatched payload carried across SSE channels.
pub struct ServerEvent {
    pub event: Option<String>,
    pub data: String,
}

impl ServerEvent {
    /// Convenience wrapper that serialises `payload` into the SSE data field.
    pub fn json<E, T>(event: E, payload: &T) -> serde_json::Result<Self>
    where
        E: Into<Option<String>>,
        T: Serialize,
    {
        Ok(Self {
            event: event.into(),
            data: serde_json::to_string(payload)?,
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
/// Assignment pointer as pushed to the scout it belongs to.
pub struct AssignmentView {
    pub match_id: Uuid,
    pub team_number: String,
}

#[derive(Debug, Serialize, ToSchema)]
/// Initial snapshot sent to an SSE client when it connects, replaying the
/// state a reconnecting client needs to resynchronize.
pub struct Handshake {
    /// Identifier of the SSE stream (`board` or `scout`).
    pub stream: String,
    /// Human-readable message confirming the subscription.
    pub message: String,
    /// Current ordered queue.
    pub queue: QueueSnapshot,
    /// Active match, if one is running.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_match: Option<MatchSummary>,
    /// The connecting scout's session state (scout streams only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<SessionView>,
    /// The connecting scout's pending assignment (scout streams only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignment: Option<AssignmentView>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
/// Broadcast whenever queue membership or order changes.
pub struct QueueChangedEvent(pub QueueSnapshot);

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
/// Broadcast when a match starts.
pub struct MatchStartedEvent(pub MatchSummary);

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
/// Broadcast when a match ends, by a lead or by its last submission.
pub struct MatchEndedEvent(pub MatchSummary);

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when a participant's record lands.
pub struct ParticipantSubmittedEvent {
    pub match_id: Uuid,
    pub user_id: Uuid,
    pub team_number: String,
    /// Active-slot submissions still outstanding after this one.
    pub remaining: u32,
}

#[derive(Debug, Serialize, ToSchema)]
/// Pushed to one scout when their assignment pointer changes.
pub struct AssignmentChangedEvent {
    /// New pointer, or `null` when the assignment was cleared.
    pub assignment: Option<AssignmentView>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
/// Pushed to one scout whenever their session state changes.
pub struct SessionChangedEvent(pub SessionView);

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when a scout registers.
pub struct ScoutRegisteredEvent {
    pub scout: ScoutSummary,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when a scout is removed from the roster.
pub struct ScoutRemovedEvent {
    pub user_id: Uuid,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when a scout's online flag flips.
pub struct PresenceChangedEvent {
    pub user_id: Uuid,
    pub online: bool,
}
