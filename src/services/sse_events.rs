use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use crate::{
    dao::models::{AssignmentEntity, MatchEntity, QueueEntryEntity, UserEntity},
    dto::{
        matches::MatchSummary,
        queue::QueueSnapshot,
        scouts::ScoutSummary,
        session::SessionView,
        sse::{
            AssignmentChangedEvent, AssignmentView, MatchEndedEvent, MatchStartedEvent,
            ParticipantSubmittedEvent, PresenceChangedEvent, QueueChangedEvent,
            ScoutRegisteredEvent, ScoutRemovedEvent, ServerEvent, SessionChangedEvent,
        },
    },
    state::{SessionSnapshot, SharedState},
};

const EVENT_QUEUE_CHANGED: &str = "queue.changed";
const EVENT_MATCH_STARTED: &str = "match.started";
const EVENT_MATCH_ENDED: &str = "match.ended";
const EVENT_PARTICIPANT_SUBMITTED: &str = "participant.submitted";
const EVENT_SCOUT_REGISTERED: &str = "scout.registered";
const EVENT_SCOUT_REMOVED: &str = "scout.removed";
const EVENT_PRESENCE_CHANGED: &str = "presence.changed";
const EVENT_ASSIGNMENT_CHANGED: &str = "assignment.changed";
const EVENT_SESSION_CHANGED: &str = "session.changed";

/// Broadcast the post-change queue to every board subscriber.
pub fn broadcast_queue_changed(state: &SharedState, queue: Vec<QueueEntryEntity>) {
    let payload = QueueChangedEvent(QueueSnapshot::from(queue));
    send_board_event(state, EVENT_QUEUE_CHANGED, &payload);
}

/// Broadcast a freshly started match.
pub fn broadcast_match_started(state: &SharedState, entity: MatchEntity) {
    let payload = MatchStartedEvent(MatchSummary::from(entity));
    send_board_event(state, EVENT_MATCH_STARTED, &payload);
}

/// Broadcast a match end, whether by a lead or via the last submission.
pub fn broadcast_match_ended(state: &SharedState, entity: MatchEntity) {
    let payload = MatchEndedEvent(MatchSummary::from(entity));
    send_board_event(state, EVENT_MATCH_ENDED, &payload);
}

/// Broadcast that a participant's record has landed.
pub fn broadcast_participant_submitted(
    state: &SharedState,
    match_id: Uuid,
    user_id: Uuid,
    team_number: String,
    remaining: u32,
) {
    let payload = ParticipantSubmittedEvent {
        match_id,
        user_id,
        team_number,
        remaining,
    };
    send_board_event(state, EVENT_PARTICIPANT_SUBMITTED, &payload);
}

/// Broadcast a roster addition.
pub fn broadcast_scout_registered(state: &SharedState, user: UserEntity) {
    let payload = ScoutRegisteredEvent {
        scout: ScoutSummary::from(user),
    };
    send_board_event(state, EVENT_SCOUT_REGISTERED, &payload);
}

/// Broadcast a roster removal.
pub fn broadcast_scout_removed(state: &SharedState, user_id: Uuid) {
    let payload = ScoutRemovedEvent { user_id };
    send_board_event(state, EVENT_SCOUT_REMOVED, &payload);
}

/// Broadcast a presence flip.
pub fn broadcast_presence_changed(state: &SharedState, user_id: Uuid, online: bool) {
    let payload = PresenceChangedEvent { user_id, online };
    send_board_event(state, EVENT_PRESENCE_CHANGED, &payload);
}

/// Push an assignment change to the scout it belongs to.
pub fn notify_assignment_changed(
    state: &SharedState,
    user_id: Uuid,
    assignment: Option<AssignmentEntity>,
) {
    let payload = AssignmentChangedEvent {
        assignment: assignment.map(assignment_view),
    };
    send_scout_event(state, user_id, EVENT_ASSIGNMENT_CHANGED, &payload);
}

/// Push a session snapshot to the scout it belongs to.
pub fn notify_session_changed(state: &SharedState, user_id: Uuid, snapshot: SessionSnapshot) {
    let payload = SessionChangedEvent(SessionView::from(snapshot));
    send_scout_event(state, user_id, EVENT_SESSION_CHANGED, &payload);
}

/// Project an assignment entity into its push representation.
pub fn assignment_view(assignment: AssignmentEntity) -> AssignmentView {
    AssignmentView {
        match_id: assignment.match_id,
        team_number: assignment.team_number,
    }
}

fn send_board_event(state: &SharedState, event: &str, payload: &impl Serialize) {
    match ServerEvent::json(Some(event.to_string()), payload) {
        Ok(event) => state.board_sse().broadcast(event),
        Err(err) => warn!(event, error = %err, "failed to serialize board SSE payload"),
    }
}

fn send_scout_event(state: &SharedState, user_id: Uuid, event: &str, payload: &impl Serialize) {
    match ServerEvent::json(Some(event.to_string()), payload) {
        Ok(event) => state.notify_scout(user_id, event),
        Err(err) => warn!(event, %user_id, error = %err, "failed to serialize scout SSE payload"),
    }
}
