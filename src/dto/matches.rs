use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dao::models::{
        AutonomousCaptureEntity, CaptureEntity, EndGameCaptureEntity, MatchEntity,
        MatchStatusEntity, ParticipantEntity, TeleopCaptureEntity,
    },
    dto::{format_system_time, validation::validate_team_roster},
};

/// Payload a lead sends to start a match from the head of the queue.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct StartMatchRequest {
    /// Lead requesting the start.
    pub user_id: Uuid,
    /// Team numbers by slot, one per queue entry being consumed.
    #[validate(custom(function = validate_team_roster))]
    pub team_assignments: Vec<String>,
}

/// Payload a lead sends to end the active match early.
#[derive(Debug, Deserialize, ToSchema)]
pub struct EndMatchRequest {
    /// Lead requesting the end.
    pub user_id: Uuid,
}

#[derive(Debug, Serialize, ToSchema)]
/// Autonomous observations as served to review clients.
pub struct AutonomousReport {
    pub fuel: u32,
    pub notes: String,
    pub can_climb: bool,
}

#[derive(Debug, Serialize, ToSchema)]
/// Teleop observations as served to review clients.
pub struct TeleopReport {
    pub fuel: u32,
    pub notes: String,
}

#[derive(Debug, Serialize, ToSchema)]
/// End game observations as served to review clients.
pub struct EndGameReport {
    pub did_climb: bool,
    pub climb_level: u8,
    pub defense_score: u8,
    pub notes: String,
}

#[derive(Debug, Serialize, ToSchema)]
/// Full capture payload as served to review clients.
pub struct CaptureReport {
    pub autonomous: AutonomousReport,
    pub teleop: TeleopReport,
    pub end_game: EndGameReport,
}

#[derive(Debug, Serialize, ToSchema)]
/// One scout's slot within a match.
pub struct ParticipantSummary {
    pub user_id: Uuid,
    pub scout_name: String,
    pub team_number: String,
    /// Whether the record has been finalized.
    pub submitted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<String>,
    pub capture: CaptureReport,
}

#[derive(Debug, Serialize, ToSchema)]
/// Match projection served over REST and broadcast on the board stream.
pub struct MatchSummary {
    pub match_id: Uuid,
    /// Lifecycle state (`active` or `ended`).
    pub status: String,
    pub started_by: Uuid,
    pub started_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<String>,
    pub team_assignments: Vec<String>,
    pub participants: Vec<ParticipantSummary>,
    /// Active-slot submissions still outstanding.
    pub slots_remaining: u32,
}

#[derive(Debug, Serialize, ToSchema)]
/// Recent matches, newest first.
pub struct MatchListResponse {
    pub matches: Vec<MatchSummary>,
}

impl From<AutonomousCaptureEntity> for AutonomousReport {
    fn from(capture: AutonomousCaptureEntity) -> Self {
        Self {
            fuel: capture.fuel,
            notes: capture.notes,
            can_climb: capture.can_climb,
        }
    }
}

impl From<TeleopCaptureEntity> for TeleopReport {
    fn from(capture: TeleopCaptureEntity) -> Self {
        Self {
            fuel: capture.fuel,
            notes: capture.notes,
        }
    }
}

impl From<EndGameCaptureEntity> for EndGameReport {
    fn from(capture: EndGameCaptureEntity) -> Self {
        Self {
            did_climb: capture.did_climb,
            climb_level: capture.climb_level,
            defense_score: capture.defense_score,
            notes: capture.notes,
        }
    }
}

impl From<CaptureEntity> for CaptureReport {
    fn from(capture: CaptureEntity) -> Self {
        Self {
            autonomous: capture.autonomous.into(),
            teleop: capture.teleop.into(),
            end_game: capture.end_game.into(),
        }
    }
}

impl From<ParticipantEntity> for ParticipantSummary {
    fn from(participant: ParticipantEntity) -> Self {
        Self {
            user_id: participant.user_id,
            scout_name: participant.scout_name,
            team_number: participant.team_number,
            submitted: participant.submitted_at.is_some(),
            submitted_at: participant.submitted_at.map(format_system_time),
            capture: participant.capture.into(),
        }
    }
}

impl From<MatchEntity> for MatchSummary {
    fn from(entity: MatchEntity) -> Self {
        let status = match entity.status {
            MatchStatusEntity::Active => "active",
            MatchStatusEntity::Ended => "ended",
        };

        Self {
            match_id: entity.id,
            status: status.to_string(),
            started_by: entity.started_by,
            started_at: format_system_time(entity.started_at),
            ended_at: entity.ended_at.map(format_system_time),
            team_assignments: entity.team_assignments,
            participants: entity.participants.into_iter().map(Into::into).collect(),
            slots_remaining: entity.slots_remaining,
        }
    }
}
