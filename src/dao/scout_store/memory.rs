use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::SystemTime,
};

use futures::future::BoxFuture;
use indexmap::IndexMap;
use uuid::Uuid;

use crate::dao::{
    models::{
        AssignmentEntity, CaptureEntity, MatchEntity, MatchStatusEntity, ParticipantEntity,
        QueueEntryEntity, UserEntity,
    },
    scout_store::{
        BeginMatchOutcome, EndMatchOutcome, QueueJoinOutcome, ScoutStore, SubmitOutcome,
        UserRemoval,
    },
    storage::StorageResult,
};

/// In-process document tree holding scouts, the queue, assignments, and matches.
///
/// Every trait method takes the single lock once, so each operation is one
/// atomic step against the whole tree. The queue is insertion-ordered, which is
/// also join-stamp order, so snapshots are stable even when two joins land on
/// the same millisecond.
#[derive(Clone, Default)]
pub struct MemoryScoutStore {
    inner: Arc<Mutex<StoreInner>>,
}

#[derive(Default)]
struct StoreInner {
    users: HashMap<Uuid, UserEntity>,
    queue: IndexMap<Uuid, QueueEntryEntity>,
    assignments: HashMap<Uuid, AssignmentEntity>,
    matches: IndexMap<Uuid, MatchEntity>,
    active_match: Option<Uuid>,
}

impl StoreInner {
    fn queue_snapshot(&self) -> Vec<QueueEntryEntity> {
        self.queue.values().cloned().collect()
    }
}

impl MemoryScoutStore {
    /// Construct an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, StoreInner> {
        // A poisoned lock only means another thread panicked mid-operation;
        // the tree itself is still usable.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ScoutStore for MemoryScoutStore {
    fn upsert_user(&self, user: UserEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store.lock().users.insert(user.id, user);
            Ok(())
        })
    }

    fn find_user(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<UserEntity>>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.lock().users.get(&id).cloned()) })
    }

    fn remove_user(&self, id: Uuid) -> BoxFuture<'static, StorageResult<UserRemoval>> {
        let store = self.clone();
        Box::pin(async move {
            let mut inner = store.lock();
            let existed = inner.users.remove(&id).is_some();
            let left_queue = inner.queue.shift_remove(&id).is_some();
            let cleared_assignment = inner.assignments.remove(&id);
            let queue = inner.queue_snapshot();
            Ok(UserRemoval {
                existed,
                left_queue,
                cleared_assignment,
                queue,
            })
        })
    }

    fn list_users(&self) -> BoxFuture<'static, StorageResult<Vec<UserEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let mut users: Vec<UserEntity> = store.lock().users.values().cloned().collect();
            users.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
            Ok(users)
        })
    }

    fn set_presence(
        &self,
        id: Uuid,
        online: bool,
        last_active: SystemTime,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            if let Some(user) = store.lock().users.get_mut(&id) {
                user.online = online;
                user.last_active = last_active;
            }
            Ok(())
        })
    }

    fn queue_join(
        &self,
        user_id: Uuid,
        name: String,
    ) -> BoxFuture<'static, StorageResult<(QueueJoinOutcome, Vec<QueueEntryEntity>)>> {
        let store = self.clone();
        Box::pin(async move {
            let mut inner = store.lock();
            if inner.queue.contains_key(&user_id) {
                return Ok((QueueJoinOutcome::AlreadyQueued, inner.queue_snapshot()));
            }
            inner.queue.insert(
                user_id,
                QueueEntryEntity {
                    user_id,
                    name,
                    joined_at: SystemTime::now(),
                },
            );
            Ok((QueueJoinOutcome::Joined, inner.queue_snapshot()))
        })
    }

    fn queue_leave(
        &self,
        user_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<(bool, Vec<QueueEntryEntity>)>> {
        let store = self.clone();
        Box::pin(async move {
            let mut inner = store.lock();
            let removed = inner.queue.shift_remove(&user_id).is_some();
            Ok((removed, inner.queue_snapshot()))
        })
    }

    fn queue_snapshot(&self) -> BoxFuture<'static, StorageResult<Vec<QueueEntryEntity>>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.lock().queue_snapshot()) })
    }

    fn begin_match(
        &self,
        started_by: Uuid,
        team_numbers: Vec<String>,
        max_slots: usize,
    ) -> BoxFuture<'static, StorageResult<BeginMatchOutcome>> {
        let store = self.clone();
        Box::pin(async move {
            let mut inner = store.lock();
            if inner.active_match.is_some() {
                return Ok(BeginMatchOutcome::ActiveExists);
            }

            let take = max_slots.min(inner.queue.len());
            if take == 0 || take != team_numbers.len() {
                return Ok(BeginMatchOutcome::SlotMismatch {
                    expected: take,
                    provided: team_numbers.len(),
                });
            }

            let selected: Vec<QueueEntryEntity> =
                inner.queue.drain(..take).map(|(_, entry)| entry).collect();

            let id = Uuid::new_v4();
            let participants: Vec<ParticipantEntity> = selected
                .iter()
                .zip(team_numbers.iter())
                .map(|(entry, team)| {
                    ParticipantEntity::unsubmitted(
                        entry.user_id,
                        entry.name.clone(),
                        team.clone(),
                        id,
                    )
                })
                .collect();

            for participant in &participants {
                inner.assignments.insert(
                    participant.user_id,
                    AssignmentEntity {
                        match_id: id,
                        team_number: participant.team_number.clone(),
                    },
                );
            }

            let entity = MatchEntity {
                id,
                status: MatchStatusEntity::Active,
                started_by,
                started_at: SystemTime::now(),
                ended_at: None,
                team_assignments: team_numbers,
                slots_remaining: take as u32,
                participants,
            };
            inner.matches.insert(id, entity.clone());
            inner.active_match = Some(id);
            Ok(BeginMatchOutcome::Started(entity))
        })
    }

    fn end_match(&self, match_id: Uuid) -> BoxFuture<'static, StorageResult<EndMatchOutcome>> {
        let store = self.clone();
        Box::pin(async move {
            let mut inner = store.lock();
            let Some(entity) = inner.matches.get_mut(&match_id) else {
                return Ok(EndMatchOutcome::Missing);
            };
            if entity.status == MatchStatusEntity::Ended {
                return Ok(EndMatchOutcome::AlreadyEnded(entity.clone()));
            }

            entity.status = MatchStatusEntity::Ended;
            entity.ended_at = Some(SystemTime::now());
            let finalized = entity.clone();

            if inner.active_match == Some(match_id) {
                inner.active_match = None;
            }
            let cleared_assignments: Vec<Uuid> = inner
                .assignments
                .iter()
                .filter(|(_, assignment)| assignment.match_id == match_id)
                .map(|(user_id, _)| *user_id)
                .collect();
            for user_id in &cleared_assignments {
                inner.assignments.remove(user_id);
            }

            Ok(EndMatchOutcome::Ended {
                entity: finalized,
                cleared_assignments,
            })
        })
    }

    fn find_match(
        &self,
        match_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<MatchEntity>>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.lock().matches.get(&match_id).cloned()) })
    }

    fn active_match(&self) -> BoxFuture<'static, StorageResult<Option<MatchEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let inner = store.lock();
            Ok(inner
                .active_match
                .and_then(|id| inner.matches.get(&id).cloned()))
        })
    }

    fn recent_matches(
        &self,
        limit: usize,
    ) -> BoxFuture<'static, StorageResult<Vec<MatchEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            Ok(store
                .lock()
                .matches
                .values()
                .rev()
                .take(limit)
                .cloned()
                .collect())
        })
    }

    fn assignment(
        &self,
        user_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<AssignmentEntity>>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.lock().assignments.get(&user_id).cloned()) })
    }

    fn clear_assignment(&self, user_id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.lock().assignments.remove(&user_id).is_some()) })
    }

    fn submit_participant(
        &self,
        match_id: Uuid,
        user_id: Uuid,
        capture: CaptureEntity,
    ) -> BoxFuture<'static, StorageResult<SubmitOutcome>> {
        let store = self.clone();
        Box::pin(async move {
            let mut inner = store.lock();
            let Some(entity) = inner.matches.get_mut(&match_id) else {
                return Ok(SubmitOutcome::MatchMissing);
            };
            let match_active = entity.status == MatchStatusEntity::Active;

            let Some(participant) = entity
                .participants
                .iter_mut()
                .find(|participant| participant.user_id == user_id)
            else {
                return Ok(SubmitOutcome::ParticipantMissing);
            };
            if participant.submitted_at.is_some() {
                return Ok(SubmitOutcome::AlreadySubmitted);
            }

            participant.capture = capture;
            participant.submitted_at = Some(SystemTime::now());
            if match_active {
                entity.slots_remaining = entity.slots_remaining.saturating_sub(1);
            }
            let remaining = entity.slots_remaining;

            // Only drop the pointer if it still targets this match; a late
            // submission must not clobber an assignment for the next match.
            if inner
                .assignments
                .get(&user_id)
                .is_some_and(|assignment| assignment.match_id == match_id)
            {
                inner.assignments.remove(&user_id);
            }

            Ok(SubmitOutcome::Recorded {
                remaining,
                match_active,
            })
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store.lock();
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn join(store: &MemoryScoutStore, name: &str) -> Uuid {
        let id = Uuid::new_v4();
        store
            .upsert_user(UserEntity {
                id,
                name: name.into(),
                lead: false,
                online: true,
                last_active: SystemTime::now(),
            })
            .await
            .unwrap();
        store.queue_join(id, name.into()).await.unwrap();
        id
    }

    fn names(queue: &[QueueEntryEntity]) -> Vec<&str> {
        queue.iter().map(|entry| entry.name.as_str()).collect()
    }

    #[tokio::test]
    async fn join_is_idempotent_and_keeps_one_entry() {
        let store = MemoryScoutStore::new();
        let id = join(&store, "ada").await;

        let (outcome, queue) = store.queue_join(id, "ada".into()).await.unwrap();
        assert_eq!(outcome, QueueJoinOutcome::AlreadyQueued);
        assert_eq!(queue.len(), 1);
        assert_eq!(queue[0].user_id, id);
    }

    #[tokio::test]
    async fn queue_keeps_join_order_across_leaves() {
        let store = MemoryScoutStore::new();
        let _a = join(&store, "ada").await;
        let b = join(&store, "brian").await;
        let _c = join(&store, "cleo").await;

        let (removed, queue) = store.queue_leave(b).await.unwrap();
        assert!(removed);
        assert_eq!(names(&queue), ["ada", "cleo"]);

        let (removed_again, _) = store.queue_leave(b).await.unwrap();
        assert!(!removed_again);
    }

    #[tokio::test]
    async fn begin_match_consumes_queue_head_and_writes_assignments() {
        let store = MemoryScoutStore::new();
        let lead = Uuid::new_v4();
        let a = join(&store, "ada").await;
        let b = join(&store, "brian").await;
        let c = join(&store, "cleo").await;

        let outcome = store
            .begin_match(lead, vec!["100".into(), "200".into(), "300".into()], 6)
            .await
            .unwrap();
        let BeginMatchOutcome::Started(entity) = outcome else {
            panic!("expected a started match, got {outcome:?}");
        };

        assert_eq!(entity.slots_remaining, 3);
        assert_eq!(entity.participants.len(), 3);
        assert_eq!(entity.participants[0].user_id, a);
        assert_eq!(entity.participants[0].team_number, "100");
        assert_eq!(entity.participants[2].user_id, c);
        assert_eq!(entity.participants[2].team_number, "300");

        assert!(store.queue_snapshot().await.unwrap().is_empty());
        let assignment = store.assignment(b).await.unwrap().unwrap();
        assert_eq!(assignment.match_id, entity.id);
        assert_eq!(assignment.team_number, "200");
    }

    #[tokio::test]
    async fn begin_match_leaves_overflow_scouts_queued() {
        let store = MemoryScoutStore::new();
        let lead = Uuid::new_v4();
        join(&store, "ada").await;
        join(&store, "brian").await;
        let c = join(&store, "cleo").await;

        let outcome = store
            .begin_match(lead, vec!["1".into(), "2".into()], 2)
            .await
            .unwrap();
        assert!(matches!(outcome, BeginMatchOutcome::Started(_)));

        let queue = store.queue_snapshot().await.unwrap();
        assert_eq!(names(&queue), ["cleo"]);
        assert!(store.assignment(c).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn begin_match_rejects_second_active_match_without_writes() {
        let store = MemoryScoutStore::new();
        let lead = Uuid::new_v4();
        join(&store, "ada").await;
        let outcome = store.begin_match(lead, vec!["1".into()], 6).await.unwrap();
        assert!(matches!(outcome, BeginMatchOutcome::Started(_)));

        let d = join(&store, "dora").await;
        let outcome = store.begin_match(lead, vec!["4".into()], 6).await.unwrap();
        assert_eq!(outcome, BeginMatchOutcome::ActiveExists);

        let queue = store.queue_snapshot().await.unwrap();
        assert_eq!(queue.len(), 1);
        assert_eq!(queue[0].user_id, d);
    }

    #[tokio::test]
    async fn begin_match_slot_mismatch_mutates_nothing() {
        let store = MemoryScoutStore::new();
        let lead = Uuid::new_v4();
        let a = join(&store, "ada").await;
        join(&store, "brian").await;

        let outcome = store
            .begin_match(lead, vec!["1".into(), "2".into(), "3".into()], 6)
            .await
            .unwrap();
        assert_eq!(
            outcome,
            BeginMatchOutcome::SlotMismatch {
                expected: 2,
                provided: 3
            }
        );

        assert_eq!(store.queue_snapshot().await.unwrap().len(), 2);
        assert!(store.assignment(a).await.unwrap().is_none());
        assert!(store.active_match().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn end_match_is_idempotent_and_clears_assignments() {
        let store = MemoryScoutStore::new();
        let lead = Uuid::new_v4();
        let a = join(&store, "ada").await;
        let BeginMatchOutcome::Started(entity) =
            store.begin_match(lead, vec!["1".into()], 6).await.unwrap()
        else {
            panic!("start failed");
        };

        let outcome = store.end_match(entity.id).await.unwrap();
        let EndMatchOutcome::Ended {
            entity: finalized,
            cleared_assignments,
        } = outcome
        else {
            panic!("expected the first end to close the match, got {outcome:?}");
        };
        assert_eq!(finalized.status, MatchStatusEntity::Ended);
        assert!(finalized.ended_at.is_some());
        assert_eq!(cleared_assignments, [a]);
        assert!(store.assignment(a).await.unwrap().is_none());
        assert!(store.active_match().await.unwrap().is_none());

        let outcome = store.end_match(entity.id).await.unwrap();
        assert!(matches!(outcome, EndMatchOutcome::AlreadyEnded(_)));

        let outcome = store.end_match(Uuid::new_v4()).await.unwrap();
        assert_eq!(outcome, EndMatchOutcome::Missing);
    }

    #[tokio::test]
    async fn submit_decrements_remaining_and_rejects_resubmission() {
        let store = MemoryScoutStore::new();
        let lead = Uuid::new_v4();
        let a = join(&store, "ada").await;
        let b = join(&store, "brian").await;
        let BeginMatchOutcome::Started(entity) = store
            .begin_match(lead, vec!["1".into(), "2".into()], 6)
            .await
            .unwrap()
        else {
            panic!("start failed");
        };

        let mut capture = CaptureEntity::default();
        capture.autonomous.fuel = 4;
        let outcome = store
            .submit_participant(entity.id, a, capture.clone())
            .await
            .unwrap();
        assert_eq!(
            outcome,
            SubmitOutcome::Recorded {
                remaining: 1,
                match_active: true
            }
        );
        assert!(store.assignment(a).await.unwrap().is_none());

        let outcome = store
            .submit_participant(entity.id, a, CaptureEntity::default())
            .await
            .unwrap();
        assert_eq!(outcome, SubmitOutcome::AlreadySubmitted);

        let stored = store.find_match(entity.id).await.unwrap().unwrap();
        let participant = &stored.participants[0];
        assert_eq!(participant.capture.autonomous.fuel, 4);
        assert!(participant.is_submitted());

        let outcome = store
            .submit_participant(entity.id, b, CaptureEntity::default())
            .await
            .unwrap();
        assert_eq!(
            outcome,
            SubmitOutcome::Recorded {
                remaining: 0,
                match_active: true
            }
        );
    }

    #[tokio::test]
    async fn late_submission_into_ended_match_is_recorded_without_counting() {
        let store = MemoryScoutStore::new();
        let lead = Uuid::new_v4();
        let a = join(&store, "ada").await;
        join(&store, "brian").await;
        let BeginMatchOutcome::Started(entity) = store
            .begin_match(lead, vec!["1".into(), "2".into()], 6)
            .await
            .unwrap()
        else {
            panic!("start failed");
        };

        store.end_match(entity.id).await.unwrap();

        let outcome = store
            .submit_participant(entity.id, a, CaptureEntity::default())
            .await
            .unwrap();
        assert_eq!(
            outcome,
            SubmitOutcome::Recorded {
                remaining: 2,
                match_active: false
            }
        );
        let stored = store.find_match(entity.id).await.unwrap().unwrap();
        assert!(stored.participants[0].is_submitted());
    }

    #[tokio::test]
    async fn submit_rejects_unknown_match_and_stranger() {
        let store = MemoryScoutStore::new();
        let lead = Uuid::new_v4();
        join(&store, "ada").await;
        let BeginMatchOutcome::Started(entity) =
            store.begin_match(lead, vec!["1".into()], 6).await.unwrap()
        else {
            panic!("start failed");
        };

        let outcome = store
            .submit_participant(Uuid::new_v4(), lead, CaptureEntity::default())
            .await
            .unwrap();
        assert_eq!(outcome, SubmitOutcome::MatchMissing);

        let outcome = store
            .submit_participant(entity.id, Uuid::new_v4(), CaptureEntity::default())
            .await
            .unwrap();
        assert_eq!(outcome, SubmitOutcome::ParticipantMissing);
    }

    #[tokio::test]
    async fn remove_user_drops_queue_entry_and_assignment() {
        let store = MemoryScoutStore::new();
        let lead = Uuid::new_v4();
        let a = join(&store, "ada").await;
        let b = join(&store, "brian").await;
        let BeginMatchOutcome::Started(_) =
            store.begin_match(lead, vec!["1".into()], 1).await.unwrap()
        else {
            panic!("start failed");
        };

        // ada was consumed by the match, brian still queues.
        let removal = store.remove_user(a).await.unwrap();
        assert!(removal.existed);
        assert!(!removal.left_queue);
        assert!(removal.cleared_assignment.is_some());

        let removal = store.remove_user(b).await.unwrap();
        assert!(removal.existed);
        assert!(removal.left_queue);
        assert!(removal.cleared_assignment.is_none());
        assert!(removal.queue.is_empty());
    }
}
