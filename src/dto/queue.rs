use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{dao::models::QueueEntryEntity, dto::format_system_time};

/// Payload identifying the scout joining or leaving the queue.
#[derive(Debug, Deserialize, ToSchema)]
pub struct QueueMembershipRequest {
    pub user_id: Uuid,
}

#[derive(Debug, Serialize, ToSchema)]
/// One queue position as shown on the shared board.
pub struct QueueEntryDto {
    pub user_id: Uuid,
    pub name: String,
    pub joined_at: String,
    /// Zero-based position; the head of the queue is position zero.
    pub position: usize,
}

#[derive(Debug, Serialize, ToSchema)]
/// Ordered queue as shown on the shared board, head first.
pub struct QueueSnapshot {
    pub entries: Vec<QueueEntryDto>,
}

impl From<Vec<QueueEntryEntity>> for QueueSnapshot {
    fn from(entries: Vec<QueueEntryEntity>) -> Self {
        Self {
            entries: entries
                .into_iter()
                .enumerate()
                .map(|(position, entry)| QueueEntryDto {
                    user_id: entry.user_id,
                    name: entry.name,
                    joined_at: format_system_time(entry.joined_at),
                    position,
                })
                .collect(),
        }
    }
}
