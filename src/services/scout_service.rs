use std::time::SystemTime;

use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    dao::models::UserEntity,
    dto::scouts::{RegisterScoutRequest, RosterResponse, ScoutSummary},
    error::ServiceError,
    services::sse_events,
    state::SharedState,
};

/// Register a scout on the shared roster.
pub async fn register(
    state: &SharedState,
    request: RegisterScoutRequest,
) -> Result<ScoutSummary, ServiceError> {
    let name = request.name.trim();
    if name.is_empty() {
        return Err(ServiceError::InvalidInput(
            "scout name must not be empty".into(),
        ));
    }

    let user = UserEntity {
        id: Uuid::new_v4(),
        name: name.to_string(),
        lead: request.lead,
        online: false,
        last_active: SystemTime::now(),
    };

    state.store().upsert_user(user.clone()).await?;
    info!(user_id = %user.id, name = %user.name, lead = user.lead, "scout registered");
    sse_events::broadcast_scout_registered(state, user.clone());

    Ok(user.into())
}

/// Roster of every registered scout, sorted by name for stable display.
pub async fn roster(state: &SharedState) -> Result<RosterResponse, ServiceError> {
    let mut users = state.store().list_users().await?;
    users.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));

    Ok(RosterResponse {
        scouts: users.into_iter().map(Into::into).collect(),
    })
}

/// Remove a scout together with everything hanging off them: queue entry,
/// assignment pointer, session slot, and live connection.
pub async fn remove(state: &SharedState, user_id: Uuid) -> Result<(), ServiceError> {
    let removal = state.store().remove_user(user_id).await?;
    if !removal.existed {
        return Err(ServiceError::NotFound(format!(
            "scout `{user_id}` not found"
        )));
    }

    state.drop_session(user_id);
    state.scout_connections().remove(&user_id);

    sse_events::broadcast_scout_removed(state, user_id);
    if removal.left_queue {
        sse_events::broadcast_queue_changed(state, removal.queue);
    }
    if let Some(assignment) = removal.cleared_assignment {
        info!(
            %user_id,
            match_id = %assignment.match_id,
            "removed scout's held assignment discarded"
        );
    }
    info!(%user_id, "scout removed from roster");

    Ok(())
}

/// Look up a registered scout, translating absence into a service error.
pub async fn require_user(state: &SharedState, user_id: Uuid) -> Result<UserEntity, ServiceError> {
    state
        .store()
        .find_user(user_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("scout `{user_id}` not found")))
}

/// Flip a scout's presence flag and stamp `last_active`. Best-effort: failures
/// are logged, never surfaced.
pub async fn mark_presence(state: &SharedState, user_id: Uuid, online: bool) {
    match state
        .store()
        .set_presence(user_id, online, SystemTime::now())
        .await
    {
        Ok(()) => sse_events::broadcast_presence_changed(state, user_id, online),
        Err(err) => warn!(
            %user_id,
            online,
            error = %err,
            "presence update failed; the roster may show stale presence"
        ),
    }
}
