mod memory;

pub use memory::MemoryScoutStore;

use std::time::SystemTime;

use futures::future::BoxFuture;
use uuid::Uuid;

use crate::dao::models::{
    AssignmentEntity, CaptureEntity, MatchEntity, QueueEntryEntity, UserEntity,
};
use crate::dao::storage::StorageResult;

/// Outcome of an idempotent queue join.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueJoinOutcome {
    /// A new entry was appended to the tail of the queue.
    Joined,
    /// The scout already held an entry; nothing changed.
    AlreadyQueued,
}

/// Outcome of the match start transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BeginMatchOutcome {
    /// The match was created; queue entries were consumed and assignments written.
    Started(MatchEntity),
    /// Another match is still active; nothing was written.
    ActiveExists,
    /// The team list did not line up with the queue head at commit time; nothing
    /// was written.
    SlotMismatch {
        /// Slots the transaction would have filled from the queue.
        expected: usize,
        /// Team numbers the caller provided.
        provided: usize,
    },
}

/// Outcome of the idempotent match end transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndMatchOutcome {
    /// This call closed the match; the listed scouts had their assignments cleared.
    Ended {
        /// The match as finalized.
        entity: MatchEntity,
        /// Scouts whose assignment pointers were removed.
        cleared_assignments: Vec<Uuid>,
    },
    /// The match was already ended; nothing changed.
    AlreadyEnded(MatchEntity),
    /// No such match.
    Missing,
}

/// Outcome of the submission transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The capture payload was written and `submitted_at` stamped.
    Recorded {
        /// Active-slot submissions still outstanding after this one.
        remaining: u32,
        /// Whether the match was still active at commit time. Late submissions
        /// into an ended match are recorded but never drive completion.
        match_active: bool,
    },
    /// The participant record was already finalized; nothing changed.
    AlreadySubmitted,
    /// No such match.
    MatchMissing,
    /// The scout is not a participant of that match.
    ParticipantMissing,
}

/// Result of removing a user together with every record hanging off them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRemoval {
    /// Whether a user record existed at all.
    pub existed: bool,
    /// Whether a queue entry was dropped.
    pub left_queue: bool,
    /// Assignment pointer that was cleared, if any.
    pub cleared_assignment: Option<AssignmentEntity>,
    /// Queue snapshot after the removal.
    pub queue: Vec<QueueEntryEntity>,
}

/// Abstraction over the shared document tree backing queue, matches, and scouts.
///
/// Every method is one atomic step: multi-path mutations (match start, user
/// removal, submission) commit entirely or not at all, so no client ever
/// observes an in-between state.
pub trait ScoutStore: Send + Sync {
    /// Insert or replace a scout record.
    fn upsert_user(&self, user: UserEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Look up a scout by id.
    fn find_user(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<UserEntity>>>;
    /// Remove a scout and their queue entry and assignment in one step.
    fn remove_user(&self, id: Uuid) -> BoxFuture<'static, StorageResult<UserRemoval>>;
    /// All registered scouts.
    fn list_users(&self) -> BoxFuture<'static, StorageResult<Vec<UserEntity>>>;
    /// Flip a scout's online flag and stamp `last_active`.
    fn set_presence(
        &self,
        id: Uuid,
        online: bool,
        last_active: SystemTime,
    ) -> BoxFuture<'static, StorageResult<()>>;

    /// Append a scout to the queue tail, or leave the queue untouched if they
    /// already hold an entry. Returns the outcome and the post-call snapshot.
    fn queue_join(
        &self,
        user_id: Uuid,
        name: String,
    ) -> BoxFuture<'static, StorageResult<(QueueJoinOutcome, Vec<QueueEntryEntity>)>>;
    /// Drop a scout's queue entry if present. Returns whether anything changed
    /// and the post-call snapshot.
    fn queue_leave(
        &self,
        user_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<(bool, Vec<QueueEntryEntity>)>>;
    /// Ordered queue snapshot, head first.
    fn queue_snapshot(&self) -> BoxFuture<'static, StorageResult<Vec<QueueEntryEntity>>>;

    /// The match start transaction: verify no match is active, take the first
    /// `min(max_slots, queue length)` entries, require one team number per
    /// taken entry, then create the match, write assignments, and drain the
    /// consumed entries.
    fn begin_match(
        &self,
        started_by: Uuid,
        team_numbers: Vec<String>,
        max_slots: usize,
    ) -> BoxFuture<'static, StorageResult<BeginMatchOutcome>>;
    /// Close a match and clear its participants' assignment pointers. Safe to
    /// call repeatedly.
    fn end_match(&self, match_id: Uuid) -> BoxFuture<'static, StorageResult<EndMatchOutcome>>;
    /// Look up a match by id.
    fn find_match(&self, match_id: Uuid)
    -> BoxFuture<'static, StorageResult<Option<MatchEntity>>>;
    /// The currently active match, if any.
    fn active_match(&self) -> BoxFuture<'static, StorageResult<Option<MatchEntity>>>;
    /// Matches newest first, at most `limit`.
    fn recent_matches(&self, limit: usize)
    -> BoxFuture<'static, StorageResult<Vec<MatchEntity>>>;

    /// A scout's assignment pointer, if any.
    fn assignment(
        &self,
        user_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<AssignmentEntity>>>;
    /// Drop a scout's assignment pointer. Returns whether one existed.
    fn clear_assignment(&self, user_id: Uuid) -> BoxFuture<'static, StorageResult<bool>>;

    /// The submission transaction: reject a second submission, write the capture
    /// payload, stamp `submitted_at`, clear the scout's assignment, and
    /// decrement the match's remaining counter while it is active.
    fn submit_participant(
        &self,
        match_id: Uuid,
        user_id: Uuid,
        capture: CaptureEntity,
    ) -> BoxFuture<'static, StorageResult<SubmitOutcome>>;

    /// Verify the backend is reachable.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
}
