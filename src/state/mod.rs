/// Per-scout session state machine.
pub mod session;
mod sse;

use std::{sync::Arc, time::Duration};

use dashmap::DashMap;
use tokio::sync::{Mutex, RwLock, mpsc};
use tokio::task::AbortHandle;
use tokio::time::timeout;
use tracing::warn;
use uuid::Uuid;

use crate::{
    config::AppConfig, dao::scout_store::ScoutStore, dto::sse::ServerEvent, error::ServiceError,
};

pub use self::session::{
    AbortError, ApplyError, Plan, PlanError, PlanId, ScoutingSession, SessionEvent, SessionMode,
    SessionPhase, SessionSnapshot, SessionTimings,
};
pub use self::sse::SseHub;

/// Shared handle to the application state.
pub type SharedState = Arc<AppState>;

/// Handle used to push events to one connected scout's SSE stream.
#[derive(Clone)]
pub struct ScoutConnection {
    /// Scout this pipe belongs to.
    pub user_id: Uuid,
    /// Sender feeding the scout's personal SSE forwarder.
    pub tx: mpsc::UnboundedSender<ServerEvent>,
}

/// One scout's session machine together with its coordination primitives.
///
/// The gate serialises plan/work/apply sequences so a slow submission cannot
/// interleave with another transition on the same session. The ticker handle
/// belongs to the 1 Hz countdown task and is aborted on pause, phase change,
/// and teardown so no timer outlives its session.
pub struct SessionSlot {
    machine: RwLock<ScoutingSession>,
    transition_gate: Mutex<()>,
    ticker: std::sync::Mutex<Option<AbortHandle>>,
}

impl SessionSlot {
    fn new(timings: SessionTimings) -> Self {
        Self {
            machine: RwLock::new(ScoutingSession::new(timings)),
            transition_gate: Mutex::new(()),
            ticker: std::sync::Mutex::new(None),
        }
    }

    /// Borrow the session machine lock.
    pub fn machine(&self) -> &RwLock<ScoutingSession> {
        &self.machine
    }

    /// Replace the countdown task handle, aborting any previous one.
    pub fn store_ticker(&self, handle: AbortHandle) {
        let mut guard = self
            .ticker
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Some(previous) = guard.replace(handle) {
            previous.abort();
        }
    }

    /// Abort the countdown task, if one is running.
    pub fn stop_ticker(&self) {
        let mut guard = self
            .ticker
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Some(handle) = guard.take() {
            handle.abort();
        }
    }
}

impl Drop for SessionSlot {
    fn drop(&mut self) {
        self.stop_ticker();
    }
}

/// Central application state storing the shared store handle, live scout
/// connections, and per-scout session slots.
pub struct AppState {
    config: AppConfig,
    store: Arc<dyn ScoutStore>,
    board_sse: SseHub,
    scout_connections: DashMap<Uuid, ScoutConnection>,
    sessions: DashMap<Uuid, Arc<SessionSlot>>,
    transition_timeout: Option<Duration>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    pub fn new(config: AppConfig, store: Arc<dyn ScoutStore>) -> SharedState {
        let transition_timeout = Some(config.submit_timeout());
        Arc::new(Self {
            config,
            store,
            board_sse: SseHub::new(16),
            scout_connections: DashMap::new(),
            sessions: DashMap::new(),
            transition_timeout,
        })
    }

    /// Runtime configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Handle to the shared document store.
    pub fn store(&self) -> Arc<dyn ScoutStore> {
        Arc::clone(&self.store)
    }

    /// Broadcast hub for the shared board SSE stream.
    pub fn board_sse(&self) -> &SseHub {
        &self.board_sse
    }

    /// Registry of live per-scout SSE pipes keyed by user id.
    pub fn scout_connections(&self) -> &DashMap<Uuid, ScoutConnection> {
        &self.scout_connections
    }

    /// Countdown lengths sessions run with, derived from configuration.
    pub fn session_timings(&self) -> SessionTimings {
        SessionTimings {
            autonomous_secs: self.config.autonomous_secs,
            teleop_secs: self.config.teleop_reference_secs(),
        }
    }

    /// Fetch or lazily create the session slot for a scout.
    pub fn session_slot(&self, user_id: Uuid) -> Arc<SessionSlot> {
        self.sessions
            .entry(user_id)
            .or_insert_with(|| Arc::new(SessionSlot::new(self.session_timings())))
            .clone()
    }

    /// Snapshot a scout's session without creating a slot for them.
    pub async fn peek_session(&self, user_id: Uuid) -> Option<SessionSnapshot> {
        let slot = self.sessions.get(&user_id).map(|slot| Arc::clone(&slot))?;
        let machine = slot.machine.read().await;
        Some(machine.snapshot())
    }

    /// Tear down a scout's session slot entirely, stopping its ticker.
    pub fn drop_session(&self, user_id: Uuid) {
        if let Some((_, slot)) = self.sessions.remove(&user_id) {
            slot.stop_ticker();
        }
    }

    /// Push an event to one scout's personal stream, if they are connected.
    pub fn notify_scout(&self, user_id: Uuid, event: ServerEvent) {
        let Some(connection) = self.scout_connections.get(&user_id) else {
            return;
        };

        let tx = connection.tx.clone();
        drop(connection);

        if tx.send(event).is_err() {
            warn!(%user_id, "scout SSE pipe is gone; event dropped");
        }
    }

    /// Run a session transition with work sandwiched between plan and apply.
    ///
    /// The work future typically performs the store writes backing the
    /// transition. On failure or timeout the plan is aborted and the session
    /// keeps its phase and capture data, which is what lets a failed
    /// submission be retried.
    pub async fn run_session_transition<F, Fut, T>(
        &self,
        user_id: Uuid,
        event: SessionEvent,
        work: F,
    ) -> Result<(T, SessionSnapshot), ServiceError>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<T, ServiceError>>,
    {
        let slot = self.session_slot(user_id);
        let gate = slot.transition_gate.lock().await;

        let Plan { id: plan_id, .. } = {
            let mut machine = slot.machine.write().await;
            machine.plan(event.clone())?
        };

        let work_future = work();
        let outcome = if let Some(limit) = self.transition_timeout {
            match timeout(limit, work_future).await {
                Ok(result) => result,
                Err(_) => {
                    Self::abort_plan(&slot, user_id, &event, plan_id).await;
                    drop(gate);
                    return Err(ServiceError::Timeout);
                }
            }
        } else {
            work_future.await
        };

        match outcome {
            Ok(value) => {
                let snapshot = {
                    let mut machine = slot.machine.write().await;
                    machine.apply(plan_id)?;
                    machine.snapshot()
                };
                drop(gate);
                Ok((value, snapshot))
            }
            Err(err) => {
                Self::abort_plan(&slot, user_id, &event, plan_id).await;
                drop(gate);
                Err(err)
            }
        }
    }

    async fn abort_plan(slot: &SessionSlot, user_id: Uuid, event: &SessionEvent, plan_id: PlanId) {
        let mut machine = slot.machine.write().await;
        if let Err(abort_err) = machine.abort(plan_id) {
            warn!(
                %user_id,
                event = ?event,
                plan_id = %plan_id,
                error = ?abort_err,
                "failed to abort session transition"
            );
        }
    }
}
