use tracing::warn;
use uuid::Uuid;

use crate::{
    dao::scout_store::QueueJoinOutcome,
    dto::queue::QueueSnapshot,
    error::ServiceError,
    services::{scout_service, sse_events},
    state::SharedState,
};

/// Append a scout to the queue tail. Idempotent: joining twice leaves the
/// queue untouched.
pub async fn join(state: &SharedState, user_id: Uuid) -> Result<QueueSnapshot, ServiceError> {
    let user = scout_service::require_user(state, user_id).await?;

    let (outcome, queue) = state.store().queue_join(user.id, user.name).await?;
    if outcome == QueueJoinOutcome::Joined {
        sse_events::broadcast_queue_changed(state, queue.clone());
    }

    Ok(queue.into())
}

/// Drop a scout's queue entry. A no-op if they are not queued.
pub async fn leave(state: &SharedState, user_id: Uuid) -> Result<QueueSnapshot, ServiceError> {
    let (changed, queue) = state.store().queue_leave(user_id).await?;
    if changed {
        sse_events::broadcast_queue_changed(state, queue.clone());
    }

    Ok(queue.into())
}

/// Ordered queue snapshot, head first.
pub async fn snapshot(state: &SharedState) -> Result<QueueSnapshot, ServiceError> {
    Ok(state.store().queue_snapshot().await?.into())
}

/// Best-effort disconnect cleanup: drop the queue entry and mark the scout
/// offline. Failures are logged and swallowed; a reconnecting scout simply
/// rejoins.
pub async fn presence_teardown(state: &SharedState, user_id: Uuid) {
    match state.store().queue_leave(user_id).await {
        Ok((true, queue)) => sse_events::broadcast_queue_changed(state, queue),
        Ok((false, _)) => {}
        Err(err) => warn!(
            %user_id,
            error = %err,
            "disconnect queue cleanup failed; the entry remains until the scout reconnects"
        ),
    }

    scout_service::mark_presence(state, user_id, false).await;
}
