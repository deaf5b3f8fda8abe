use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{dao::models::UserEntity, dto::format_system_time};

/// Payload used to register a scout on the shared board.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct RegisterScoutRequest {
    /// Display name shown on the queue and on match records.
    #[validate(length(min = 1, max = 64))]
    pub name: String,
    /// Whether the scout may start and end matches.
    #[serde(default)]
    pub lead: bool,
}

#[derive(Debug, Serialize, ToSchema)]
/// Public projection of a registered scout.
pub struct ScoutSummary {
    pub user_id: Uuid,
    pub name: String,
    pub lead: bool,
    pub online: bool,
    pub last_active: String,
}

impl From<UserEntity> for ScoutSummary {
    fn from(user: UserEntity) -> Self {
        Self {
            user_id: user.id,
            name: user.name,
            lead: user.lead,
            online: user.online,
            last_active: format_system_time(user.last_active),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
/// Roster of every registered scout.
pub struct RosterResponse {
    pub scouts: Vec<ScoutSummary>,
}
