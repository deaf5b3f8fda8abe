use std::{sync::Arc, time::Duration};

use tokio::time::{self, Instant};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    dao::{
        models::{AssignmentEntity, CaptureEntity},
        scout_store::SubmitOutcome,
    },
    dto::session::{
        AdvancePhaseRequest, CancelResponse, CaptureRequest, ManualStartRequest, PhaseTarget,
        SessionView, SubmitResponse, TimerRequest,
    },
    error::ServiceError,
    services::{match_service, scout_service, sse_events},
    state::{
        ScoutingSession, SessionEvent, SessionMode, SessionPhase, SessionSnapshot, SharedState,
        session::{CancelClick, ResetReason},
    },
};

/// What a submission produced, gathered inside the transition work so the
/// response and the follow-up events use committed data.
struct Submission {
    match_id: Option<Uuid>,
    team_number: String,
    capture: CaptureEntity,
    remaining: Option<u32>,
    match_active: bool,
}

/// Start a session against a hand-typed team number.
pub async fn start_manual(
    state: &SharedState,
    user_id: Uuid,
    request: ManualStartRequest,
) -> Result<SessionView, ServiceError> {
    scout_service::require_user(state, user_id).await?;

    let event = SessionEvent::Begin {
        mode: SessionMode::Manual,
        team_number: request.team_number,
    };
    let ((), snapshot) = state
        .run_session_transition(user_id, event, || async { Ok(()) })
        .await?;

    info!(
        %user_id,
        team = snapshot.team_number.as_deref().unwrap_or_default(),
        "manual session started"
    );
    publish_session(state, user_id, &snapshot);

    Ok(snapshot.into())
}

/// Advance the session one phase ("Next Phase" or "End Game").
pub async fn advance(
    state: &SharedState,
    user_id: Uuid,
    request: AdvancePhaseRequest,
) -> Result<SessionView, ServiceError> {
    let event = match request.target {
        PhaseTarget::Teleop => SessionEvent::AdvanceToTeleop,
        PhaseTarget::Complete => SessionEvent::FinishScouting,
    };

    let ((), snapshot) = state
        .run_session_transition(user_id, event, || async { Ok(()) })
        .await?;

    publish_session(state, user_id, &snapshot);
    Ok(snapshot.into())
}

/// Pause or resume the countdown without touching the phase.
pub async fn set_timer(
    state: &SharedState,
    user_id: Uuid,
    request: TimerRequest,
) -> Result<SessionView, ServiceError> {
    let slot = state.session_slot(user_id);
    let (was_running, snapshot) = {
        let mut machine = slot.machine().write().await;
        let was_running = machine.timer().running;
        machine.set_timer_running(request.running);
        (was_running, machine.snapshot())
    };

    sse_events::notify_session_changed(state, user_id, snapshot.clone());
    match (was_running, snapshot.timer.running) {
        (false, true) => start_ticker(state, user_id),
        (true, false) => slot.stop_ticker(),
        _ => {}
    }

    Ok(snapshot.into())
}

/// Apply a capture edit to the current phase's fields.
pub async fn capture(
    state: &SharedState,
    user_id: Uuid,
    request: CaptureRequest,
) -> Result<SessionView, ServiceError> {
    let slot = state.session_slot(user_id);
    let snapshot = {
        let mut machine = slot.machine().write().await;
        machine
            .apply_capture(request.into())
            .map_err(|err| ServiceError::InvalidState(err.to_string()))?;
        machine.snapshot()
    };

    sse_events::notify_session_changed(state, user_id, snapshot.clone());
    Ok(snapshot.into())
}

/// Register one cancel click: the first arms a confirmation window, a second
/// inside the window discards the session and its capture data.
pub async fn cancel(state: &SharedState, user_id: Uuid) -> Result<CancelResponse, ServiceError> {
    let slot = state.session_slot(user_id);

    let click = {
        let mut machine = slot.machine().write().await;
        if machine.phase() == SessionPhase::Idle {
            return Err(ServiceError::InvalidState("no session to cancel".into()));
        }
        machine.cancel_click(Instant::now(), state.config().cancel_confirm_window())
    };

    match click {
        CancelClick::Armed => {
            let snapshot = slot.machine().read().await.snapshot();
            sse_events::notify_session_changed(state, user_id, snapshot.clone());
            Ok(CancelResponse {
                outcome: "armed".into(),
                session: snapshot.into(),
            })
        }
        CancelClick::Confirmed => {
            let store = state.store();
            let work_slot = Arc::clone(&slot);
            let (cleared, snapshot) = state
                .run_session_transition(
                    user_id,
                    SessionEvent::Reset(ResetReason::Cancelled),
                    move || async move {
                        let mode = {
                            let machine = work_slot.machine().read().await;
                            machine.mode().cloned()
                        };

                        // A cancelled assignment must not auto-restart, so its
                        // pointer goes too. Only the pointer for this session's
                        // match though; a newer assignment stays held.
                        if let Some(SessionMode::Assigned { match_id }) = mode {
                            if let Some(pointer) = store.assignment(user_id).await? {
                                if pointer.match_id == match_id {
                                    store.clear_assignment(user_id).await?;
                                    return Ok(true);
                                }
                            }
                        }

                        Ok(false)
                    },
                )
                .await?;

            info!(%user_id, "session cancelled; capture data discarded");
            if cleared {
                sse_events::notify_assignment_changed(state, user_id, None);
            }
            publish_session(state, user_id, &snapshot);
            maybe_resume_assignment(state, user_id).await;

            Ok(CancelResponse {
                outcome: "cancelled".into(),
                session: snapshot.into(),
            })
        }
    }
}

/// Submit the session's capture data (`complete → idle`).
///
/// For assigned sessions the store transaction runs between plan and apply: a
/// failed write aborts the reset and the scout keeps phase and data for a
/// retry. Manual sessions skip the store entirely and get their payload back
/// in the response.
pub async fn submit(state: &SharedState, user_id: Uuid) -> Result<SubmitResponse, ServiceError> {
    let slot = state.session_slot(user_id);
    let store = state.store();
    let work_slot = Arc::clone(&slot);

    let (submission, snapshot) = state
        .run_session_transition(
            user_id,
            SessionEvent::Reset(ResetReason::Submitted),
            move || async move {
                let (mode, team_number, capture) = {
                    let machine = work_slot.machine().read().await;
                    let Some(mode) = machine.mode().cloned() else {
                        return Err(ServiceError::InvalidState("no session to submit".into()));
                    };
                    (
                        mode,
                        machine.team_number().unwrap_or_default().to_string(),
                        machine.capture().clone(),
                    )
                };

                match mode {
                    SessionMode::Manual => Ok(Submission {
                        match_id: None,
                        team_number,
                        capture,
                        remaining: None,
                        match_active: false,
                    }),
                    SessionMode::Assigned { match_id } => {
                        let outcome = store
                            .submit_participant(match_id, user_id, capture.clone())
                            .await
                            .map_err(ServiceError::SubmissionFailed)?;

                        match outcome {
                            SubmitOutcome::Recorded {
                                remaining,
                                match_active,
                            } => Ok(Submission {
                                match_id: Some(match_id),
                                team_number,
                                capture,
                                remaining: Some(remaining),
                                match_active,
                            }),
                            SubmitOutcome::AlreadySubmitted => Err(ServiceError::InvalidState(
                                "a record for this match is already submitted; cancel to discard \
                                 this session"
                                    .into(),
                            )),
                            SubmitOutcome::MatchMissing => Err(ServiceError::NotFound(format!(
                                "match `{match_id}` no longer exists"
                            ))),
                            SubmitOutcome::ParticipantMissing => Err(ServiceError::InvalidState(
                                "scout holds no slot in the assigned match".into(),
                            )),
                        }
                    }
                }
            },
        )
        .await?;

    publish_session(state, user_id, &snapshot);

    let mut match_ended = false;
    if let Some(match_id) = submission.match_id {
        info!(
            %user_id,
            %match_id,
            team = %submission.team_number,
            "participant record submitted"
        );
        sse_events::broadcast_participant_submitted(
            state,
            match_id,
            user_id,
            submission.team_number.clone(),
            submission.remaining.unwrap_or_default(),
        );

        if submission.remaining == Some(0) && submission.match_active {
            match_ended = match_service::finish_completed_match(state, match_id).await;
        }

        // The transaction cleared the pointer; push the refreshed value and
        // pick up any assignment that queued up behind this session.
        match state.store().assignment(user_id).await {
            Ok(pointer) => {
                sse_events::notify_assignment_changed(state, user_id, pointer.clone());
                if let Some(next) = pointer {
                    auto_start_assigned(state, user_id, next).await;
                }
            }
            Err(err) => warn!(
                %user_id,
                error = %err,
                "could not refresh the assignment after submission"
            ),
        }
    } else {
        info!(
            %user_id,
            team = %submission.team_number,
            "manual session submitted; payload returned to the caller"
        );
        // Back at idle; a held assignment that arrived mid-session starts now.
        maybe_resume_assignment(state, user_id).await;
    }

    Ok(SubmitResponse {
        session: snapshot.into(),
        match_id: submission.match_id,
        match_ended,
        report: submission.capture.into(),
    })
}

/// Current session snapshot; an idle view for scouts without a slot yet.
pub async fn session_view(state: &SharedState, user_id: Uuid) -> Result<SessionView, ServiceError> {
    scout_service::require_user(state, user_id).await?;

    let snapshot = match state.peek_session(user_id).await {
        Some(snapshot) => snapshot,
        None => ScoutingSession::new(state.session_timings()).snapshot(),
    };

    Ok(snapshot.into())
}

/// Start an assigned session if the scout is connected and idle. Quietly does
/// nothing otherwise; the assignment is held and picked up on the next return
/// to idle or on reconnect.
pub(crate) async fn auto_start_assigned(
    state: &SharedState,
    user_id: Uuid,
    assignment: AssignmentEntity,
) {
    if !state.scout_connections().contains_key(&user_id) {
        return;
    }

    {
        let slot = state.session_slot(user_id);
        let machine = slot.machine().read().await;
        if machine.phase() != SessionPhase::Idle {
            return;
        }
    }

    let AssignmentEntity {
        match_id,
        team_number,
    } = assignment;
    let event = SessionEvent::Begin {
        mode: SessionMode::Assigned { match_id },
        team_number,
    };

    match state
        .run_session_transition(user_id, event, || async { Ok(()) })
        .await
    {
        Ok(((), snapshot)) => {
            info!(%user_id, %match_id, "assigned session auto-started");
            publish_session(state, user_id, &snapshot);
        }
        Err(err) => warn!(
            %user_id,
            %match_id,
            error = %err,
            "assigned session could not auto-start; assignment left pending"
        ),
    }
}

/// Auto-start a held assignment once the scout is idle and connected again.
pub(crate) async fn maybe_resume_assignment(state: &SharedState, user_id: Uuid) {
    let assignment = match state.store().assignment(user_id).await {
        Ok(Some(assignment)) => assignment,
        Ok(None) => return,
        Err(err) => {
            warn!(%user_id, error = %err, "could not check for a held assignment");
            return;
        }
    };

    auto_start_assigned(state, user_id, assignment).await;
}

/// Push the fresh snapshot to the scout and line the ticker up with the timer.
fn publish_session(state: &SharedState, user_id: Uuid, snapshot: &SessionSnapshot) {
    sse_events::notify_session_changed(state, user_id, snapshot.clone());
    if snapshot.timer.running {
        start_ticker(state, user_id);
    } else {
        state.session_slot(user_id).stop_ticker();
    }
}

/// Spawn the 1 Hz countdown task for a scout, replacing any previous one.
///
/// Each tick decrements the machine timer under its lock and pushes the fresh
/// snapshot onto the scout's stream; the task exits once the timer stops.
fn start_ticker(state: &SharedState, user_id: Uuid) {
    let slot = state.session_slot(user_id);
    let ticker_state = Arc::clone(state);
    let ticker_slot = Arc::clone(&slot);

    let task = tokio::spawn(async move {
        let mut interval = time::interval(Duration::from_secs(1));
        // The first tick completes immediately.
        interval.tick().await;

        loop {
            interval.tick().await;

            let (timer, snapshot) = {
                let mut machine = ticker_slot.machine().write().await;
                let timer = machine.tick();
                (timer, machine.snapshot())
            };

            sse_events::notify_session_changed(&ticker_state, user_id, snapshot);

            if !timer.running {
                break;
            }
        }
    });

    slot.store_ticker(task.abort_handle());
}
