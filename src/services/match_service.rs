use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    dao::{
        models::AssignmentEntity,
        scout_store::{BeginMatchOutcome, EndMatchOutcome},
    },
    dto::{
        matches::{MatchListResponse, MatchSummary, StartMatchRequest},
        validation::validate_team_roster,
    },
    error::ServiceError,
    services::{scout_service, session_service, sse_events},
    state::SharedState,
};

/// Start a match from the head of the queue.
///
/// The store transaction owns the one-active-match invariant and the
/// queue-to-slot count check; this layer gates on the lead flag, re-validates
/// team numbers, and fans out events and auto-starts once the match commits.
pub async fn start_match(
    state: &SharedState,
    request: StartMatchRequest,
) -> Result<MatchSummary, ServiceError> {
    let lead = scout_service::require_user(state, request.user_id).await?;
    if !lead.lead {
        return Err(ServiceError::Unauthorized(
            "only a lead may start a match".into(),
        ));
    }

    // Checked again here so internal callers get the same rejection as the
    // HTTP boundary, before any write.
    validate_team_roster(&request.team_assignments).map_err(assignment_error)?;

    let outcome = state
        .store()
        .begin_match(
            lead.id,
            request.team_assignments,
            state.config().max_active_slots,
        )
        .await?;

    let entity = match outcome {
        BeginMatchOutcome::Started(entity) => entity,
        BeginMatchOutcome::ActiveExists => return Err(ServiceError::MatchAlreadyActive),
        BeginMatchOutcome::SlotMismatch { expected: 0, .. } => {
            return Err(ServiceError::InvalidAssignment(
                "no scouts are queued".into(),
            ));
        }
        BeginMatchOutcome::SlotMismatch { expected, provided } => {
            return Err(ServiceError::InvalidAssignment(format!(
                "expected {expected} team numbers for the scouts being assigned, got {provided}"
            )));
        }
    };

    info!(
        match_id = %entity.id,
        started_by = %lead.id,
        slots = entity.participants.len(),
        "match started"
    );

    sse_events::broadcast_match_started(state, entity.clone());
    match state.store().queue_snapshot().await {
        Ok(queue) => sse_events::broadcast_queue_changed(state, queue),
        Err(err) => warn!(error = %err, "could not broadcast the post-start queue"),
    }

    for participant in &entity.participants {
        let assignment = AssignmentEntity {
            match_id: entity.id,
            team_number: participant.team_number.clone(),
        };
        sse_events::notify_assignment_changed(
            state,
            participant.user_id,
            Some(assignment.clone()),
        );
        session_service::auto_start_assigned(state, participant.user_id, assignment).await;
    }

    Ok(entity.into())
}

/// End a match early. Idempotent: ending an already ended match succeeds
/// without side effects.
pub async fn end_match(
    state: &SharedState,
    match_id: Uuid,
    user_id: Uuid,
) -> Result<MatchSummary, ServiceError> {
    let lead = scout_service::require_user(state, user_id).await?;
    if !lead.lead {
        return Err(ServiceError::Unauthorized(
            "only a lead may end a match".into(),
        ));
    }

    if !state.config().any_lead_may_end {
        let existing = find_match(state, match_id).await?;
        if existing.started_by != lead.id {
            return Err(ServiceError::Unauthorized(
                "only the lead who started this match may end it".into(),
            ));
        }
    }

    match state.store().end_match(match_id).await? {
        EndMatchOutcome::Ended {
            entity,
            cleared_assignments,
        } => {
            info!(%match_id, ended_by = %lead.id, "match ended");
            sse_events::broadcast_match_ended(state, entity.clone());
            for scout_id in cleared_assignments {
                sse_events::notify_assignment_changed(state, scout_id, None);
            }
            Ok(entity.into())
        }
        EndMatchOutcome::AlreadyEnded(entity) => Ok(entity.into()),
        EndMatchOutcome::Missing => Err(ServiceError::NotFound(format!(
            "match `{match_id}` not found"
        ))),
    }
}

/// The active match, if any.
pub async fn active_match(state: &SharedState) -> Result<Option<MatchSummary>, ServiceError> {
    Ok(state.store().active_match().await?.map(Into::into))
}

/// Recent matches with their participants, newest first.
pub async fn recent_matches(state: &SharedState) -> Result<MatchListResponse, ServiceError> {
    let matches = state
        .store()
        .recent_matches(state.config().recent_matches_limit)
        .await?;

    Ok(MatchListResponse {
        matches: matches.into_iter().map(Into::into).collect(),
    })
}

/// One match by id.
pub async fn find_match(state: &SharedState, match_id: Uuid) -> Result<MatchSummary, ServiceError> {
    state
        .store()
        .find_match(match_id)
        .await?
        .map(Into::into)
        .ok_or_else(|| ServiceError::NotFound(format!("match `{match_id}` not found")))
}

/// Close a match whose last active slot just submitted. Failures are logged
/// and swallowed; the match stays open until a lead ends it. Returns whether
/// this call did the ending.
pub(crate) async fn finish_completed_match(state: &SharedState, match_id: Uuid) -> bool {
    match state.store().end_match(match_id).await {
        Ok(EndMatchOutcome::Ended {
            entity,
            cleared_assignments,
        }) => {
            info!(%match_id, "all slots submitted; match ended");
            sse_events::broadcast_match_ended(state, entity);
            for scout_id in cleared_assignments {
                sse_events::notify_assignment_changed(state, scout_id, None);
            }
            true
        }
        Ok(EndMatchOutcome::AlreadyEnded(_)) => false,
        Ok(EndMatchOutcome::Missing) => {
            warn!(%match_id, "completion detection found no match record");
            false
        }
        Err(err) => {
            warn!(
                %match_id,
                error = %err,
                "completion detection failed; the match stays open until a lead ends it"
            );
            false
        }
    }
}

fn assignment_error(err: validator::ValidationError) -> ServiceError {
    let message = err
        .message
        .as_deref()
        .map(str::to_owned)
        .unwrap_or_else(|| err.code.to_string());
    ServiceError::InvalidAssignment(message)
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::SystemTime};

    use super::*;
    use crate::{
        config::AppConfig,
        dao::models::UserEntity,
        dao::scout_store::MemoryScoutStore,
        services::queue_service,
        state::AppState,
    };

    fn harness(config: AppConfig) -> SharedState {
        AppState::new(config, Arc::new(MemoryScoutStore::new()))
    }

    async fn register(state: &SharedState, name: &str, lead: bool) -> Uuid {
        let id = Uuid::new_v4();
        state
            .store()
            .upsert_user(UserEntity {
                id,
                name: name.into(),
                lead,
                online: true,
                last_active: SystemTime::now(),
            })
            .await
            .unwrap();
        id
    }

    fn start_request(user_id: Uuid, teams: &[&str]) -> StartMatchRequest {
        StartMatchRequest {
            user_id,
            team_assignments: teams.iter().map(|team| team.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn only_leads_start_matches() {
        let state = harness(AppConfig::default());
        let scout = register(&state, "ada", false).await;
        queue_service::join(&state, scout).await.unwrap();

        let err = start_match(&state, start_request(scout, &["100"]))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Unauthorized(_)));
        assert_eq!(queue_service::snapshot(&state).await.unwrap().entries.len(), 1);
    }

    #[tokio::test]
    async fn start_assigns_queue_order_to_team_slots() {
        let state = harness(AppConfig::default());
        let lead = register(&state, "lena", true).await;
        let a = register(&state, "ada", false).await;
        let b = register(&state, "brian", false).await;
        let c = register(&state, "cleo", false).await;
        for scout in [a, b, c] {
            queue_service::join(&state, scout).await.unwrap();
        }

        let summary = start_match(&state, start_request(lead, &["100", "200", "300"]))
            .await
            .unwrap();

        assert_eq!(summary.status, "active");
        assert_eq!(summary.team_assignments, ["100", "200", "300"]);
        let pairs: Vec<(Uuid, &str)> = summary
            .participants
            .iter()
            .map(|participant| (participant.user_id, participant.team_number.as_str()))
            .collect();
        assert_eq!(pairs, [(a, "100"), (b, "200"), (c, "300")]);

        assert!(queue_service::snapshot(&state).await.unwrap().entries.is_empty());
        let assignment = state.store().assignment(b).await.unwrap().unwrap();
        assert_eq!(assignment.match_id, summary.match_id);
        assert_eq!(assignment.team_number, "200");
    }

    #[tokio::test]
    async fn start_rejects_malformed_team_numbers_without_writes() {
        let state = harness(AppConfig::default());
        let lead = register(&state, "lena", true).await;
        let a = register(&state, "ada", false).await;
        queue_service::join(&state, a).await.unwrap();

        let err = start_match(&state, start_request(lead, &["12a"]))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidAssignment(_)));

        assert_eq!(queue_service::snapshot(&state).await.unwrap().entries.len(), 1);
        assert!(state.store().active_match().await.unwrap().is_none());
        assert!(state.store().assignment(a).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn start_requires_a_populated_queue() {
        let state = harness(AppConfig::default());
        let lead = register(&state, "lena", true).await;

        let err = start_match(&state, start_request(lead, &["100"]))
            .await
            .unwrap_err();
        let ServiceError::InvalidAssignment(message) = err else {
            panic!("expected an assignment rejection, got {err:?}");
        };
        assert_eq!(message, "no scouts are queued");
    }

    #[tokio::test]
    async fn start_requires_one_team_per_consumed_slot() {
        let state = harness(AppConfig::default());
        let lead = register(&state, "lena", true).await;
        let a = register(&state, "ada", false).await;
        queue_service::join(&state, a).await.unwrap();

        let err = start_match(&state, start_request(lead, &["100", "200"]))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidAssignment(_)));
        assert_eq!(queue_service::snapshot(&state).await.unwrap().entries.len(), 1);
    }

    #[tokio::test]
    async fn concurrent_starts_yield_exactly_one_match() {
        let state = harness(AppConfig::default());
        let lead = register(&state, "lena", true).await;
        for name in ["ada", "brian"] {
            let scout = register(&state, name, false).await;
            queue_service::join(&state, scout).await.unwrap();
        }

        let (first, second) = tokio::join!(
            start_match(&state, start_request(lead, &["100", "200"])),
            start_match(&state, start_request(lead, &["100", "200"])),
        );

        let outcomes = [first, second];
        assert_eq!(outcomes.iter().filter(|result| result.is_ok()).count(), 1);
        assert!(outcomes.iter().any(|result| matches!(
            result,
            Err(ServiceError::MatchAlreadyActive)
        )));
    }

    #[tokio::test]
    async fn ending_is_idempotent_and_releases_assignments() {
        let state = harness(AppConfig::default());
        let lead = register(&state, "lena", true).await;
        let a = register(&state, "ada", false).await;
        queue_service::join(&state, a).await.unwrap();

        let started = start_match(&state, start_request(lead, &["100"]))
            .await
            .unwrap();

        let ended = end_match(&state, started.match_id, lead).await.unwrap();
        assert_eq!(ended.status, "ended");
        assert!(state.store().assignment(a).await.unwrap().is_none());
        assert!(state.store().active_match().await.unwrap().is_none());

        let again = end_match(&state, started.match_id, lead).await.unwrap();
        assert_eq!(again.status, "ended");

        let err = end_match(&state, Uuid::new_v4(), lead).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn ending_restricted_to_the_starter_when_configured() {
        let config = AppConfig {
            any_lead_may_end: false,
            ..AppConfig::default()
        };
        let state = harness(config);
        let starter = register(&state, "lena", true).await;
        let other = register(&state, "omar", true).await;
        let a = register(&state, "ada", false).await;
        queue_service::join(&state, a).await.unwrap();

        let started = start_match(&state, start_request(starter, &["100"]))
            .await
            .unwrap();

        let err = end_match(&state, started.match_id, other).await.unwrap_err();
        assert!(matches!(err, ServiceError::Unauthorized(_)));

        let ended = end_match(&state, started.match_id, starter).await.unwrap();
        assert_eq!(ended.status, "ended");
    }
}
