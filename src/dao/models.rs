use serde::{Deserialize, Serialize};
use serde_with::{TimestampMilliSeconds, serde_as};
use std::time::SystemTime;
use uuid::Uuid;

/// Registered scout stored in persistence and shared across layers.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserEntity {
    /// Stable identifier for the scout.
    pub id: Uuid,
    /// Display name chosen at registration.
    pub name: String,
    /// Whether this scout may start and end matches.
    pub lead: bool,
    /// Whether the scout currently holds a live event stream.
    pub online: bool,
    /// Last time the scout was seen (stamped on disconnect and on registration).
    #[serde_as(as = "TimestampMilliSeconds<i64>")]
    pub last_active: SystemTime,
}

/// One position in the shared scouting queue.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QueueEntryEntity {
    /// Scout owning this entry. A scout holds at most one entry.
    pub user_id: Uuid,
    /// Display name, denormalized so queue reads need no user lookup.
    pub name: String,
    /// Join time; queue order is ascending on this stamp.
    #[serde_as(as = "TimestampMilliSeconds<i64>")]
    pub joined_at: SystemTime,
}

/// Per-scout pointer binding them to a match and a team number.
///
/// Its presence is the one signal that auto-starts a scouting session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AssignmentEntity {
    /// Match the scout is bound to.
    pub match_id: Uuid,
    /// Team the scout observes, one to five digits.
    pub team_number: String,
}

/// Lifecycle state of a match.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MatchStatusEntity {
    /// Scouts are assigned and submissions are expected.
    Active,
    /// Closed by a lead or by the last submission.
    Ended,
}

/// Observations captured during the autonomous phase.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AutonomousCaptureEntity {
    /// Fuel scored while the robot ran autonomously.
    pub fuel: u32,
    /// Free-form notes.
    pub notes: String,
    /// Whether the robot looked capable of climbing.
    pub can_climb: bool,
}

/// Observations captured during teleop.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TeleopCaptureEntity {
    /// Fuel scored under driver control.
    pub fuel: u32,
    /// Free-form notes.
    pub notes: String,
}

/// Observations captured during the end game.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct EndGameCaptureEntity {
    /// Whether the robot climbed.
    pub did_climb: bool,
    /// Climb level reached, 0 (none) through 3.
    pub climb_level: u8,
    /// Defense effectiveness rating, 0 through 10.
    pub defense_score: u8,
    /// Free-form notes.
    pub notes: String,
}

/// Full capture payload for one scout's observation of one team.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CaptureEntity {
    /// Autonomous phase observations.
    pub autonomous: AutonomousCaptureEntity,
    /// Teleop phase observations.
    pub teleop: TeleopCaptureEntity,
    /// End game observations.
    pub end_game: EndGameCaptureEntity,
}

/// Per-scout data record within a match, finalized once on submission.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ParticipantEntity {
    /// Scout who owns this record.
    pub user_id: Uuid,
    /// Scout display name at assignment time.
    pub scout_name: String,
    /// Team the scout was bound to.
    pub team_number: String,
    /// Match this record belongs to.
    pub match_id: Uuid,
    /// Set exactly once when the scout submits; immutable afterwards.
    #[serde_as(as = "Option<TimestampMilliSeconds<i64>>")]
    pub submitted_at: Option<SystemTime>,
    /// Submitted observations; defaults until submission lands.
    #[serde(flatten)]
    pub capture: CaptureEntity,
}

impl ParticipantEntity {
    /// Stub record created when a match starts, before the scout submits.
    pub fn unsubmitted(
        user_id: Uuid,
        scout_name: String,
        team_number: String,
        match_id: Uuid,
    ) -> Self {
        Self {
            user_id,
            scout_name,
            team_number,
            match_id,
            submitted_at: None,
            capture: CaptureEntity::default(),
        }
    }

    /// Whether the record has been finalized.
    pub fn is_submitted(&self) -> bool {
        self.submitted_at.is_some()
    }
}

/// Aggregate match entity persisted by the storage layer.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MatchEntity {
    /// Primary key of the match.
    pub id: Uuid,
    /// Lifecycle state; at most one match is active at a time.
    pub status: MatchStatusEntity,
    /// Lead who started the match.
    pub started_by: Uuid,
    /// Start timestamp.
    #[serde_as(as = "TimestampMilliSeconds<i64>")]
    pub started_at: SystemTime,
    /// End timestamp, absent while active.
    #[serde_as(as = "Option<TimestampMilliSeconds<i64>>")]
    pub ended_at: Option<SystemTime>,
    /// Team numbers by slot index, bound at start from the queue head.
    pub team_assignments: Vec<String>,
    /// One record per active slot, in slot order.
    pub participants: Vec<ParticipantEntity>,
    /// Active-slot submissions still outstanding. Decremented inside the
    /// submission transaction; zero means every assigned scout has submitted.
    pub slots_remaining: u32,
}

impl MatchEntity {
    /// Whether the match is still accepting completion detection.
    pub fn is_active(&self) -> bool {
        self.status == MatchStatusEntity::Active
    }
}
