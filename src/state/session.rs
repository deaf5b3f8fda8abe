use thiserror::Error;
use tokio::time::Instant;
use uuid::Uuid;

use std::time::Duration;

use crate::dao::models::CaptureEntity;

/// High-level phases a scouting session can be in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// No session is running; the scout can queue or start one.
    Idle,
    /// Watching the robot run its autonomous routine.
    Autonomous,
    /// Watching driver control, from transition through end game.
    Teleop,
    /// Match observation finished; end game data is edited until submission.
    Complete,
}

/// How a running session came to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionMode {
    /// The scout typed a team number themselves. Manual sessions never touch
    /// the shared store: no participant record, no assignment pointer.
    Manual,
    /// The session was bound to a match slot by an assignment.
    Assigned {
        /// Match the assignment points at.
        match_id: Uuid,
    },
}

/// Why a session is being reset back to idle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetReason {
    /// Capture data was submitted into the match record.
    Submitted,
    /// The scout confirmed a cancel; capture data is discarded.
    Cancelled,
}

/// Events that can be applied to the session state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Begin scouting a team, resetting capture fields and starting the
    /// autonomous countdown. Requires a non-empty team number.
    Begin {
        /// Manual entry or assignment binding.
        mode: SessionMode,
        /// Team the scout observes.
        team_number: String,
    },
    /// "Next Phase": autonomous into teleop, restarting the countdown at the
    /// combined teleop reference duration.
    AdvanceToTeleop,
    /// "End Game": teleop into complete, stopping the timer.
    FinishScouting,
    /// Leave the session, either by submitting or by a confirmed cancel.
    Reset(ResetReason),
}

/// Fixed countdown lengths a session runs with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionTimings {
    /// Autonomous countdown, in seconds.
    pub autonomous_secs: u64,
    /// Combined teleop reference countdown, in seconds.
    pub teleop_secs: u64,
}

/// Countdown state: a single timer, ticked once per second while running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionTimer {
    /// Seconds left on the countdown.
    pub remaining_secs: u64,
    /// Whether the countdown is ticking.
    pub running: bool,
}

impl SessionTimer {
    fn stopped() -> Self {
        Self {
            remaining_secs: 0,
            running: false,
        }
    }

    fn restarted(secs: u64) -> Self {
        Self {
            remaining_secs: secs,
            running: secs > 0,
        }
    }
}

/// Outcome of one cancel-button click.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelClick {
    /// First click, or a click after the previous window expired: the session
    /// is now armed and waits for a confirming second click.
    Armed,
    /// Second click inside the window: the caller should discard the session.
    Confirmed,
}

/// Targeted updates to the capture fields, gated by the current phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureUpdate {
    /// Count fuel in or out; routed to the phase being watched, floored at zero.
    AddFuel {
        /// Positive to add, negative to correct a miscount.
        delta: i32,
    },
    /// Replace the notes of the phase being watched.
    SetNotes {
        /// New note text.
        notes: String,
    },
    /// Flag whether the robot looked capable of climbing (autonomous only).
    SetCanClimb {
        /// Observed capability.
        can_climb: bool,
    },
    /// Record whether the robot climbed (after "End Game" only).
    SetDidClimb {
        /// Observed climb.
        did_climb: bool,
    },
    /// Record the climb level reached, clamped to 0 through 3.
    SetClimbLevel {
        /// Observed level.
        climb_level: u8,
    },
    /// Rate defense effectiveness, clamped to 0 through 10.
    SetDefenseScore {
        /// Observed rating.
        defense_score: u8,
    },
}

/// Error returned when a capture update does not fit the current phase.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("capture update {update:?} cannot be applied while in {phase:?}")]
pub struct CaptureRejected {
    /// Phase the session was in.
    pub phase: SessionPhase,
    /// The rejected update.
    pub update: CaptureUpdate,
}

/// Error returned when attempting to apply an invalid transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid transition: {event:?} cannot be applied while in {from:?}")]
pub struct InvalidTransition {
    /// The phase the session was in when the invalid event was received.
    pub from: SessionPhase,
    /// The event that cannot be applied from this phase.
    pub event: SessionEvent,
}

/// Errors that can occur when planning a session transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    /// A transition is already pending and must be applied or aborted.
    AlreadyPending,
    /// The requested transition is not valid from the current phase.
    InvalidTransition(InvalidTransition),
}

/// Errors that can occur when applying a planned session transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyError {
    /// No transition is currently pending.
    NoPending,
    /// Plan ID does not match the pending plan.
    IdMismatch {
        /// Expected plan ID.
        expected: PlanId,
        /// Provided plan ID.
        got: PlanId,
    },
    /// Session phase changed since the plan was created.
    PhaseMismatch {
        /// Phase when plan was created.
        expected: SessionPhase,
        /// Current phase.
        actual: SessionPhase,
    },
    /// Session version changed since the plan was created.
    VersionMismatch {
        /// Version when plan was created.
        expected: usize,
        /// Current version.
        actual: usize,
    },
}

/// Errors that can occur when aborting a planned session transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbortError {
    /// No transition is currently pending.
    NoPending,
    /// Plan ID does not match the pending plan.
    IdMismatch {
        /// Expected plan ID.
        expected: PlanId,
        /// Provided plan ID.
        got: PlanId,
    },
}

/// Unique identifier for a planned session transition.
pub type PlanId = Uuid;

/// A planned session transition that has been validated but not yet applied.
///
/// The gap between plan and apply is where the submission store write runs:
/// the session only leaves `Complete` once the write has landed, and an abort
/// keeps every capture field intact for a retry.
#[derive(Debug, Clone)]
pub struct Plan {
    /// Unique identifier for this plan.
    pub id: PlanId,
    /// Phase the session is currently in.
    pub from: SessionPhase,
    /// Phase the session will transition to.
    pub to: SessionPhase,
    /// Event that triggered this transition.
    pub event: SessionEvent,
    /// Version number after applying this transition.
    pub version_next: usize,
    /// Timestamp when this plan was created.
    pub pending_since: Instant,
}

/// Snapshot of a session's full state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    /// Current phase.
    pub phase: SessionPhase,
    /// Version number (increments on each transition).
    pub version: usize,
    /// Pending transition phase, if one is planned but not yet applied.
    pub pending: Option<SessionPhase>,
    /// Manual or assigned, absent while idle.
    pub mode: Option<SessionMode>,
    /// Team under observation, absent while idle.
    pub team_number: Option<String>,
    /// Countdown state.
    pub timer: SessionTimer,
    /// Accumulated capture fields.
    pub capture: CaptureEntity,
    /// Whether a cancel click is currently armed.
    pub cancel_armed: bool,
}

/// Per-scout state machine implementing the idle, autonomous, teleop,
/// complete flow with its countdown and capture context.
#[derive(Debug, Clone)]
pub struct ScoutingSession {
    timings: SessionTimings,
    phase: SessionPhase,
    version: usize,
    pending: Option<Plan>,
    mode: Option<SessionMode>,
    team_number: String,
    timer: SessionTimer,
    capture: CaptureEntity,
    cancel_armed_at: Option<Instant>,
}

impl ScoutingSession {
    /// Create a new session machine in the idle state.
    pub fn new(timings: SessionTimings) -> Self {
        Self {
            timings,
            phase: SessionPhase::Idle,
            version: 0,
            pending: None,
            mode: None,
            team_number: String::new(),
            timer: SessionTimer::stopped(),
            capture: CaptureEntity::default(),
            cancel_armed_at: None,
        }
    }

    /// Inspect the current phase.
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Manual or assigned, absent while idle.
    pub fn mode(&self) -> Option<&SessionMode> {
        self.mode.as_ref()
    }

    /// Team under observation, absent while idle.
    pub fn team_number(&self) -> Option<&str> {
        (!self.team_number.is_empty()).then_some(self.team_number.as_str())
    }

    /// Current countdown state.
    pub fn timer(&self) -> SessionTimer {
        self.timer
    }

    /// Accumulated capture fields.
    pub fn capture(&self) -> &CaptureEntity {
        &self.capture
    }

    /// Create a snapshot of the full session state.
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            phase: self.phase,
            version: self.version,
            pending: self.pending.as_ref().map(|plan| plan.to),
            mode: self.mode.clone(),
            team_number: self.team_number().map(str::to_owned),
            timer: self.timer,
            capture: self.capture.clone(),
            cancel_armed: self.cancel_armed_at.is_some(),
        }
    }

    /// Plan a transition by validating that the event can be applied from the
    /// current phase. Returns a plan that can later be applied or aborted.
    pub fn plan(&mut self, event: SessionEvent) -> Result<Plan, PlanError> {
        if self.pending.is_some() {
            return Err(PlanError::AlreadyPending);
        }

        let next = self
            .compute_transition(&event)
            .map_err(PlanError::InvalidTransition)?;

        let plan = Plan {
            id: Uuid::new_v4(),
            from: self.phase,
            to: next,
            event,
            version_next: self.version + 1,
            pending_since: Instant::now(),
        };

        self.pending = Some(plan.clone());

        Ok(plan)
    }

    /// Apply a planned transition, moving the session to the next phase and
    /// running the event's context effects.
    pub fn apply(&mut self, plan_id: PlanId) -> Result<SessionPhase, ApplyError> {
        let plan = self.pending.take().ok_or(ApplyError::NoPending)?;

        if plan.id != plan_id {
            let expected_plan_id = plan.id;
            self.pending = Some(plan);
            return Err(ApplyError::IdMismatch {
                expected: expected_plan_id,
                got: plan_id,
            });
        }

        if self.phase != plan.from {
            return Err(ApplyError::PhaseMismatch {
                expected: plan.from,
                actual: self.phase,
            });
        }

        if self.version + 1 != plan.version_next {
            return Err(ApplyError::VersionMismatch {
                expected: plan.version_next,
                actual: self.version + 1,
            });
        }

        match plan.event {
            SessionEvent::Begin { mode, team_number } => {
                self.mode = Some(mode);
                self.team_number = team_number;
                self.capture = CaptureEntity::default();
                self.timer = SessionTimer::restarted(self.timings.autonomous_secs);
            }
            SessionEvent::AdvanceToTeleop => {
                self.timer = SessionTimer::restarted(self.timings.teleop_secs);
            }
            SessionEvent::FinishScouting => {
                self.timer.running = false;
            }
            SessionEvent::Reset(_) => {
                self.mode = None;
                self.team_number.clear();
                self.capture = CaptureEntity::default();
                self.timer = SessionTimer::stopped();
            }
        }

        self.phase = plan.to;
        self.version = plan.version_next;
        self.pending = None;
        self.cancel_armed_at = None;

        Ok(self.phase)
    }

    /// Abort a planned transition without applying it, leaving phase and
    /// capture context untouched.
    pub fn abort(&mut self, plan_id: PlanId) -> Result<(), AbortError> {
        let plan = self.pending.as_ref().ok_or(AbortError::NoPending)?;

        if plan.id != plan_id {
            return Err(AbortError::IdMismatch {
                expected: plan.id,
                got: plan_id,
            });
        }

        self.pending = None;
        Ok(())
    }

    /// Advance the countdown by one second. Reaching zero stops the timer but
    /// never advances the phase; the scout drives phases off real match events.
    pub fn tick(&mut self) -> SessionTimer {
        if self.timer.running {
            self.timer.remaining_secs = self.timer.remaining_secs.saturating_sub(1);
            if self.timer.remaining_secs == 0 {
                self.timer.running = false;
            }
        }
        self.timer
    }

    /// Pause or resume the countdown. Resuming an exhausted timer keeps it
    /// stopped.
    pub fn set_timer_running(&mut self, running: bool) -> SessionTimer {
        self.timer.running = running && self.timer.remaining_secs > 0;
        self.timer
    }

    /// Register one cancel-button click against the confirmation window.
    ///
    /// A first click, or a click landing after the previous window expired,
    /// (re)arms and returns [`CancelClick::Armed`]. A click inside the window
    /// disarms and returns [`CancelClick::Confirmed`]; the caller is expected
    /// to follow up with a [`SessionEvent::Reset`] transition.
    pub fn cancel_click(&mut self, now: Instant, window: Duration) -> CancelClick {
        match self.cancel_armed_at {
            Some(armed_at) if now.duration_since(armed_at) <= window => {
                self.cancel_armed_at = None;
                CancelClick::Confirmed
            }
            _ => {
                self.cancel_armed_at = Some(now);
                CancelClick::Armed
            }
        }
    }

    /// Apply a capture update, routing it to the fields of the current phase.
    pub fn apply_capture(&mut self, update: CaptureUpdate) -> Result<(), CaptureRejected> {
        let rejected = |phase, update| CaptureRejected { phase, update };

        match (&self.phase, update) {
            (SessionPhase::Autonomous, CaptureUpdate::AddFuel { delta }) => {
                self.capture.autonomous.fuel = add_clamped(self.capture.autonomous.fuel, delta);
            }
            (SessionPhase::Teleop, CaptureUpdate::AddFuel { delta }) => {
                self.capture.teleop.fuel = add_clamped(self.capture.teleop.fuel, delta);
            }
            (SessionPhase::Autonomous, CaptureUpdate::SetNotes { notes }) => {
                self.capture.autonomous.notes = notes;
            }
            (SessionPhase::Teleop, CaptureUpdate::SetNotes { notes }) => {
                self.capture.teleop.notes = notes;
            }
            (SessionPhase::Complete, CaptureUpdate::SetNotes { notes }) => {
                self.capture.end_game.notes = notes;
            }
            (SessionPhase::Autonomous, CaptureUpdate::SetCanClimb { can_climb }) => {
                self.capture.autonomous.can_climb = can_climb;
            }
            (SessionPhase::Complete, CaptureUpdate::SetDidClimb { did_climb }) => {
                self.capture.end_game.did_climb = did_climb;
            }
            (SessionPhase::Complete, CaptureUpdate::SetClimbLevel { climb_level }) => {
                self.capture.end_game.climb_level = climb_level.min(3);
            }
            (SessionPhase::Complete, CaptureUpdate::SetDefenseScore { defense_score }) => {
                self.capture.end_game.defense_score = defense_score.min(10);
            }
            (_, update) => return Err(rejected(self.phase, update)),
        }

        Ok(())
    }

    /// Compute a transition from an event if the transition is valid.
    fn compute_transition(&self, event: &SessionEvent) -> Result<SessionPhase, InvalidTransition> {
        let next = match (self.phase, event) {
            (SessionPhase::Idle, SessionEvent::Begin { team_number, .. })
                if !team_number.is_empty() =>
            {
                SessionPhase::Autonomous
            }
            (SessionPhase::Autonomous, SessionEvent::AdvanceToTeleop) => SessionPhase::Teleop,
            (SessionPhase::Teleop, SessionEvent::FinishScouting) => SessionPhase::Complete,
            (SessionPhase::Complete, SessionEvent::Reset(_)) => SessionPhase::Idle,
            (
                SessionPhase::Autonomous | SessionPhase::Teleop,
                SessionEvent::Reset(ResetReason::Cancelled),
            ) => SessionPhase::Idle,
            (from, event) => {
                return Err(InvalidTransition {
                    from,
                    event: event.clone(),
                });
            }
        };

        Ok(next)
    }
}

fn add_clamped(current: u32, delta: i32) -> u32 {
    if delta >= 0 {
        current.saturating_add(delta as u32)
    } else {
        current.saturating_sub(delta.unsigned_abs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIMINGS: SessionTimings = SessionTimings {
        autonomous_secs: 20,
        teleop_secs: 140,
    };

    fn session() -> ScoutingSession {
        ScoutingSession::new(TIMINGS)
    }

    fn apply(sm: &mut ScoutingSession, event: SessionEvent) -> SessionPhase {
        let plan = sm.plan(event).unwrap();
        sm.apply(plan.id).unwrap()
    }

    fn begin_manual(sm: &mut ScoutingSession, team: &str) -> SessionPhase {
        apply(
            sm,
            SessionEvent::Begin {
                mode: SessionMode::Manual,
                team_number: team.into(),
            },
        )
    }

    #[test]
    fn initial_state_is_idle() {
        let sm = session();
        assert_eq!(sm.phase(), SessionPhase::Idle);
        assert_eq!(sm.timer(), SessionTimer::stopped());
        assert!(sm.team_number().is_none());
    }

    #[test]
    fn full_happy_path_through_session() {
        let mut sm = session();

        assert_eq!(begin_manual(&mut sm, "254"), SessionPhase::Autonomous);
        assert_eq!(sm.team_number(), Some("254"));
        assert_eq!(
            sm.timer(),
            SessionTimer {
                remaining_secs: 20,
                running: true
            }
        );

        assert_eq!(
            apply(&mut sm, SessionEvent::AdvanceToTeleop),
            SessionPhase::Teleop
        );
        assert_eq!(
            sm.timer(),
            SessionTimer {
                remaining_secs: 140,
                running: true
            }
        );

        assert_eq!(
            apply(&mut sm, SessionEvent::FinishScouting),
            SessionPhase::Complete
        );
        assert!(!sm.timer().running);

        assert_eq!(
            apply(&mut sm, SessionEvent::Reset(ResetReason::Submitted)),
            SessionPhase::Idle
        );
        assert!(sm.mode().is_none());
        assert!(sm.team_number().is_none());
    }

    #[test]
    fn begin_requires_a_team_number() {
        let mut sm = session();
        let err = sm
            .plan(SessionEvent::Begin {
                mode: SessionMode::Manual,
                team_number: String::new(),
            })
            .unwrap_err();
        match err {
            PlanError::InvalidTransition(invalid) => {
                assert_eq!(invalid.from, SessionPhase::Idle);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn begin_resets_capture_fields() {
        let mut sm = session();
        begin_manual(&mut sm, "254");
        sm.apply_capture(CaptureUpdate::AddFuel { delta: 5 }).unwrap();
        apply(&mut sm, SessionEvent::Reset(ResetReason::Cancelled));

        begin_manual(&mut sm, "118");
        assert_eq!(sm.capture().autonomous.fuel, 0);
        assert_eq!(sm.team_number(), Some("118"));
    }

    #[test]
    fn submission_only_allowed_from_complete() {
        let mut sm = session();
        begin_manual(&mut sm, "254");

        let err = sm
            .plan(SessionEvent::Reset(ResetReason::Submitted))
            .unwrap_err();
        assert!(matches!(err, PlanError::InvalidTransition(_)));

        // A cancel from mid-session is allowed.
        assert_eq!(
            apply(&mut sm, SessionEvent::Reset(ResetReason::Cancelled)),
            SessionPhase::Idle
        );
    }

    #[test]
    fn aborted_submission_keeps_capture_data() {
        let mut sm = session();
        begin_manual(&mut sm, "254");
        sm.apply_capture(CaptureUpdate::AddFuel { delta: 3 }).unwrap();
        apply(&mut sm, SessionEvent::AdvanceToTeleop);
        apply(&mut sm, SessionEvent::FinishScouting);

        let plan = sm.plan(SessionEvent::Reset(ResetReason::Submitted)).unwrap();
        sm.abort(plan.id).unwrap();

        assert_eq!(sm.phase(), SessionPhase::Complete);
        assert_eq!(sm.capture().autonomous.fuel, 3);
        assert_eq!(sm.team_number(), Some("254"));

        // Retry succeeds once the store write goes through.
        let plan = sm.plan(SessionEvent::Reset(ResetReason::Submitted)).unwrap();
        assert_eq!(sm.apply(plan.id).unwrap(), SessionPhase::Idle);
    }

    #[test]
    fn plan_while_pending_is_rejected() {
        let mut sm = session();
        begin_manual(&mut sm, "254");
        apply(&mut sm, SessionEvent::AdvanceToTeleop);
        apply(&mut sm, SessionEvent::FinishScouting);

        let _plan = sm.plan(SessionEvent::Reset(ResetReason::Submitted)).unwrap();
        let err = sm
            .plan(SessionEvent::Reset(ResetReason::Cancelled))
            .unwrap_err();
        assert_eq!(err, PlanError::AlreadyPending);
    }

    #[test]
    fn timer_ticks_down_and_stops_at_zero() {
        let mut sm = ScoutingSession::new(SessionTimings {
            autonomous_secs: 2,
            teleop_secs: 140,
        });
        begin_manual(&mut sm, "254");

        assert_eq!(
            sm.tick(),
            SessionTimer {
                remaining_secs: 1,
                running: true
            }
        );
        assert_eq!(
            sm.tick(),
            SessionTimer {
                remaining_secs: 0,
                running: false
            }
        );
        // Phase does not advance on its own.
        assert_eq!(sm.phase(), SessionPhase::Autonomous);

        // Further ticks and resumes are inert at zero.
        assert_eq!(sm.tick().remaining_secs, 0);
        assert!(!sm.set_timer_running(true).running);
    }

    #[test]
    fn timer_pause_and_resume() {
        let mut sm = session();
        begin_manual(&mut sm, "254");
        sm.tick();

        let paused = sm.set_timer_running(false);
        assert!(!paused.running);
        assert_eq!(paused.remaining_secs, 19);
        // Paused timers do not tick.
        assert_eq!(sm.tick().remaining_secs, 19);

        let resumed = sm.set_timer_running(true);
        assert!(resumed.running);
        assert_eq!(sm.tick().remaining_secs, 18);
    }

    #[test]
    fn cancel_two_clicks_inside_window_confirms() {
        let mut sm = session();
        begin_manual(&mut sm, "254");
        let window = Duration::from_secs(3);

        let start = Instant::now();
        assert_eq!(sm.cancel_click(start, window), CancelClick::Armed);
        assert_eq!(
            sm.cancel_click(start + Duration::from_secs(2), window),
            CancelClick::Confirmed
        );
    }

    #[test]
    fn cancel_expired_window_rearms_instead_of_confirming() {
        let mut sm = session();
        begin_manual(&mut sm, "254");
        let window = Duration::from_secs(3);

        let start = Instant::now();
        assert_eq!(sm.cancel_click(start, window), CancelClick::Armed);
        // Past the window: this click arms again rather than discarding.
        assert_eq!(
            sm.cancel_click(start + Duration::from_secs(4), window),
            CancelClick::Armed
        );
        // And the new window works from the second click.
        assert_eq!(
            sm.cancel_click(start + Duration::from_secs(5), window),
            CancelClick::Confirmed
        );
    }

    #[test]
    fn applied_transition_disarms_cancel() {
        let mut sm = session();
        begin_manual(&mut sm, "254");
        let window = Duration::from_secs(3);

        let start = Instant::now();
        sm.cancel_click(start, window);
        apply(&mut sm, SessionEvent::AdvanceToTeleop);
        assert!(!sm.snapshot().cancel_armed);

        // The click after the transition starts a fresh window.
        assert_eq!(
            sm.cancel_click(start + Duration::from_secs(1), window),
            CancelClick::Armed
        );
    }

    #[test]
    fn capture_updates_route_by_phase() {
        let mut sm = session();
        begin_manual(&mut sm, "254");

        sm.apply_capture(CaptureUpdate::AddFuel { delta: 3 }).unwrap();
        sm.apply_capture(CaptureUpdate::SetCanClimb { can_climb: true })
            .unwrap();
        sm.apply_capture(CaptureUpdate::SetNotes {
            notes: "fast start".into(),
        })
        .unwrap();

        apply(&mut sm, SessionEvent::AdvanceToTeleop);
        sm.apply_capture(CaptureUpdate::AddFuel { delta: 7 }).unwrap();
        sm.apply_capture(CaptureUpdate::AddFuel { delta: -2 }).unwrap();

        apply(&mut sm, SessionEvent::FinishScouting);
        sm.apply_capture(CaptureUpdate::SetDidClimb { did_climb: true })
            .unwrap();
        sm.apply_capture(CaptureUpdate::SetClimbLevel { climb_level: 9 })
            .unwrap();
        sm.apply_capture(CaptureUpdate::SetDefenseScore { defense_score: 40 })
            .unwrap();

        let capture = sm.capture();
        assert_eq!(capture.autonomous.fuel, 3);
        assert!(capture.autonomous.can_climb);
        assert_eq!(capture.autonomous.notes, "fast start");
        assert_eq!(capture.teleop.fuel, 5);
        assert!(capture.end_game.did_climb);
        assert_eq!(capture.end_game.climb_level, 3);
        assert_eq!(capture.end_game.defense_score, 10);
    }

    #[test]
    fn capture_updates_rejected_in_wrong_phase() {
        let mut sm = session();
        let err = sm
            .apply_capture(CaptureUpdate::AddFuel { delta: 1 })
            .unwrap_err();
        assert_eq!(err.phase, SessionPhase::Idle);

        begin_manual(&mut sm, "254");
        // End game data cannot be recorded before "End Game".
        assert!(
            sm.apply_capture(CaptureUpdate::SetDidClimb { did_climb: true })
                .is_err()
        );
        // Fuel cannot be corrected below zero.
        sm.apply_capture(CaptureUpdate::AddFuel { delta: -5 }).unwrap();
        assert_eq!(sm.capture().autonomous.fuel, 0);
    }

    #[test]
    fn fuel_subtraction_floors_at_zero() {
        assert_eq!(add_clamped(0, -1), 0);
        assert_eq!(add_clamped(2, -3), 0);
        assert_eq!(add_clamped(2, 3), 5);
    }

    #[test]
    fn assigned_mode_is_part_of_the_snapshot() {
        let mut sm = session();
        let match_id = Uuid::new_v4();
        apply(
            &mut sm,
            SessionEvent::Begin {
                mode: SessionMode::Assigned { match_id },
                team_number: "1678".into(),
            },
        );

        let snapshot = sm.snapshot();
        assert_eq!(snapshot.mode, Some(SessionMode::Assigned { match_id }));
        assert_eq!(snapshot.team_number.as_deref(), Some("1678"));
        assert_eq!(snapshot.phase, SessionPhase::Autonomous);
    }

    #[test]
    fn abort_clears_pending() {
        let mut sm = session();
        let plan = sm
            .plan(SessionEvent::Begin {
                mode: SessionMode::Manual,
                team_number: "254".into(),
            })
            .unwrap();
        sm.abort(plan.id).unwrap();
        assert!(sm.snapshot().pending.is_none());
        assert_eq!(sm.phase(), SessionPhase::Idle);
    }
}
