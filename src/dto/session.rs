use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::{matches::CaptureReport, validation::validate_team_number},
    state::{
        SessionMode, SessionPhase, SessionSnapshot,
        session::{CaptureUpdate, SessionTimer},
    },
};

/// Payload starting a session against a hand-typed team number.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct ManualStartRequest {
    /// Team the scout wants to observe, one to five digits.
    #[validate(custom(function = validate_team_number))]
    pub team_number: String,
}

/// Phase a scout advances their session to. Phases only ever move forward and
/// only when the scout asks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PhaseTarget {
    /// "Next Phase": autonomous into teleop.
    Teleop,
    /// "End Game": teleop into complete.
    Complete,
}

/// Payload advancing the session one phase.
#[derive(Debug, Deserialize, ToSchema)]
pub struct AdvancePhaseRequest {
    pub target: PhaseTarget,
}

/// Payload pausing or resuming the countdown.
#[derive(Debug, Deserialize, ToSchema)]
pub struct TimerRequest {
    pub running: bool,
}

/// One capture edit, routed to the fields of the session's current phase.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum CaptureRequest {
    /// Count fuel in, or out to correct a miscount.
    AddFuel { delta: i32 },
    /// Replace the notes of the current phase.
    SetNotes { notes: String },
    /// Flag climb capability (autonomous only).
    SetCanClimb { can_climb: bool },
    /// Record whether the robot climbed (after "End Game" only).
    SetDidClimb { did_climb: bool },
    /// Record the climb level reached (after "End Game" only).
    SetClimbLevel { climb_level: u8 },
    /// Rate defense effectiveness (after "End Game" only).
    SetDefenseScore { defense_score: u8 },
}

impl From<CaptureRequest> for CaptureUpdate {
    fn from(request: CaptureRequest) -> Self {
        match request {
            CaptureRequest::AddFuel { delta } => Self::AddFuel { delta },
            CaptureRequest::SetNotes { notes } => Self::SetNotes { notes },
            CaptureRequest::SetCanClimb { can_climb } => Self::SetCanClimb { can_climb },
            CaptureRequest::SetDidClimb { did_climb } => Self::SetDidClimb { did_climb },
            CaptureRequest::SetClimbLevel { climb_level } => Self::SetClimbLevel { climb_level },
            CaptureRequest::SetDefenseScore { defense_score } => {
                Self::SetDefenseScore { defense_score }
            }
        }
    }
}

/// Session phase as serialized to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SessionPhaseDto {
    Idle,
    Autonomous,
    Teleop,
    Complete,
}

impl From<SessionPhase> for SessionPhaseDto {
    fn from(phase: SessionPhase) -> Self {
        match phase {
            SessionPhase::Idle => Self::Idle,
            SessionPhase::Autonomous => Self::Autonomous,
            SessionPhase::Teleop => Self::Teleop,
            SessionPhase::Complete => Self::Complete,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
/// Countdown state as serialized to clients.
pub struct TimerView {
    pub remaining_secs: u64,
    pub running: bool,
}

impl From<SessionTimer> for TimerView {
    fn from(timer: SessionTimer) -> Self {
        Self {
            remaining_secs: timer.remaining_secs,
            running: timer.running,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
/// Session projection served over REST and pushed on the scout's own stream.
pub struct SessionView {
    pub phase: SessionPhaseDto,
    /// Monotonic counter bumped on every phase change.
    pub version: usize,
    /// `manual` or `assigned`, absent while idle.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    /// Match bound to the session when its mode is `assigned`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team_number: Option<String>,
    pub timer: TimerView,
    pub capture: CaptureReport,
    /// Whether a cancel click is waiting for its confirmation.
    pub cancel_armed: bool,
}

impl From<SessionSnapshot> for SessionView {
    fn from(snapshot: SessionSnapshot) -> Self {
        let (mode, match_id) = match snapshot.mode {
            Some(SessionMode::Manual) => (Some("manual".to_string()), None),
            Some(SessionMode::Assigned { match_id }) => {
                (Some("assigned".to_string()), Some(match_id))
            }
            None => (None, None),
        };

        Self {
            phase: snapshot.phase.into(),
            version: snapshot.version,
            mode,
            match_id,
            team_number: snapshot.team_number,
            timer: snapshot.timer.into(),
            capture: snapshot.capture.into(),
            cancel_armed: snapshot.cancel_armed,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
/// Reply to one cancel click.
pub struct CancelResponse {
    /// `armed` while waiting for the confirming click, `cancelled` once the
    /// session has been discarded.
    pub outcome: String,
    pub session: SessionView,
}

#[derive(Debug, Serialize, ToSchema)]
/// Reply to a successful submission.
pub struct SubmitResponse {
    /// Session after the reset, back at idle.
    pub session: SessionView,
    /// Match that received the record, absent for manual sessions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_id: Option<Uuid>,
    /// Whether this submission closed the match.
    pub match_ended: bool,
    /// The capture payload as recorded.
    pub report: CaptureReport,
}
