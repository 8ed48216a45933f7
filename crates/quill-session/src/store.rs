//! Session registry: per-session state, subscriber fan-out, idle sweep.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use quill_core::{QuillError, QuillResult, RunId, SessionEvent, SessionId};

use crate::bridge::PendingToolRequests;

/// Buffered events per subscriber before the sink counts as stalled.
const SUBSCRIBER_BUFFER: usize = 256;

/// Tunable session-layer settings.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// How long a round waits for tool results before failing the run.
    pub tool_timeout_secs: u64,
    /// How long an idle session survives between sweeps.
    pub idle_window_secs: u64,
    /// Hard cap on rounds per run.
    pub max_rounds: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            tool_timeout_secs: 120,
            idle_window_secs: 30 * 60,
            max_rounds: 16,
        }
    }
}

impl SessionConfig {
    /// Tool-result wait bound as a [`Duration`].
    #[must_use]
    pub fn tool_timeout(&self) -> Duration {
        Duration::from_secs(self.tool_timeout_secs)
    }

    /// Idle window as a [`Duration`].
    #[must_use]
    pub fn idle_window(&self) -> Duration {
        Duration::from_secs(self.idle_window_secs)
    }
}

/// The run currently owning a session, if any.
struct ActiveRun {
    run_id: RunId,
    cancel: CancellationToken,
}

/// One live session: subscribers, pending tool requests, run guard.
pub struct Session {
    /// Session identifier.
    pub id: SessionId,
    /// Outstanding tool requests for this session's runs.
    pub pending: PendingToolRequests,
    subscribers: Mutex<Vec<mpsc::Sender<SessionEvent>>>,
    last_touched: Mutex<Instant>,
    active_run: Mutex<Option<ActiveRun>>,
}

impl Session {
    fn new(id: SessionId) -> Self {
        Self {
            id,
            pending: PendingToolRequests::new(),
            subscribers: Mutex::new(Vec::new()),
            last_touched: Mutex::new(Instant::now()),
            active_run: Mutex::new(None),
        }
    }

    /// Record activity, deferring the idle sweep.
    pub fn touch(&self) {
        *self.last_touched.lock() = Instant::now();
    }

    /// Time since the last recorded activity.
    #[must_use]
    pub fn idle_for(&self) -> Duration {
        self.last_touched.lock().elapsed()
    }

    /// The active run's ID, if a run is in flight.
    #[must_use]
    pub fn active_run_id(&self) -> Option<RunId> {
        self.active_run.lock().as_ref().map(|r| r.run_id.clone())
    }

    /// Attach a subscriber and immediately replay `session.connected`.
    pub fn subscribe(&self) -> mpsc::Receiver<SessionEvent> {
        self.touch();
        let (tx, rx) = mpsc::channel(SUBSCRIBER_BUFFER);
        // The channel was just created with capacity, so this cannot fail.
        let _ = tx.try_send(SessionEvent::connected(self.id.clone()));
        self.subscribers.lock().push(tx);
        rx
    }

    /// Fan an event out to every live subscriber, dropping dead sinks.
    pub fn publish(&self, event: &SessionEvent) {
        self.touch();
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|tx| match tx.try_send(event.clone()) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Closed(_)) => false,
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(
                    session_id = %self.id,
                    event_type = event.event_type(),
                    "dropping stalled subscriber"
                );
                false
            }
        });
    }

    /// Number of attached subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }

    /// Claim the session for a new run.
    ///
    /// Fails with `Conflict` while another run is active. On success the
    /// caller owns the returned cancellation token and must release the
    /// claim through [`Self::finish_run`].
    pub fn begin_run(&self) -> QuillResult<(RunId, CancellationToken)> {
        let mut active = self.active_run.lock();
        if let Some(run) = active.as_ref() {
            return Err(QuillError::Conflict(format!(
                "run {} is already active on session {}",
                run.run_id, self.id
            )));
        }
        let run_id = RunId::new();
        let cancel = CancellationToken::new();
        *active = Some(ActiveRun {
            run_id: run_id.clone(),
            cancel: cancel.clone(),
        });
        Ok((run_id, cancel))
    }

    /// Release the run claim and reject any of its leftover tool requests.
    pub fn finish_run(&self, run_id: &RunId) {
        {
            let mut active = self.active_run.lock();
            match active.as_ref() {
                Some(run) if run.run_id == *run_id => {
                    run.cancel.cancel();
                    *active = None;
                }
                _ => return,
            }
        }
        self.pending.fail_run(run_id);
        self.touch();
    }
}

/// Registry of live sessions.
///
/// There is no background timer; the idle sweep piggybacks on session
/// creation and removes sessions with no active run that sat untouched for
/// the configured idle window.
pub struct SessionStore {
    sessions: DashMap<SessionId, Arc<Session>>,
    config: SessionConfig,
}

impl SessionStore {
    /// Create an empty store with the given settings.
    #[must_use]
    pub fn new(config: SessionConfig) -> Self {
        Self {
            sessions: DashMap::new(),
            config,
        }
    }

    /// The settings this store was built with.
    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Create a new session, sweeping idle ones first.
    pub fn create(&self) -> Arc<Session> {
        self.sweep_idle();
        let session = Arc::new(Session::new(SessionId::new()));
        let _ = self.sessions.insert(session.id.clone(), session.clone());
        debug!(session_id = %session.id, total = self.sessions.len(), "session created");
        session
    }

    /// Look up a session by ID.
    pub fn get(&self, id: &SessionId) -> QuillResult<Arc<Session>> {
        self.sessions
            .get(id)
            .map(|entry| entry.clone())
            .ok_or_else(|| QuillError::not_found(id.as_str()))
    }

    /// Number of live sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether the store holds no sessions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn sweep_idle(&self) {
        let window = self.config.idle_window();
        let before = self.sessions.len();
        self.sessions
            .retain(|_, session| session.active_run_id().is_some() || session.idle_for() < window);
        let swept = before - self.sessions.len();
        if swept > 0 {
            debug!(swept, remaining = self.sessions.len(), "idle sessions swept");
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[tokio::test]
    async fn subscribe_replays_connected_first() {
        let store = SessionStore::new(SessionConfig::default());
        let session = store.create();
        let mut rx = session.subscribe();

        let event = rx.recv().await.unwrap();
        assert_matches!(
            event,
            SessionEvent::SessionConnected { session_id, .. } if session_id == session.id
        );
    }

    #[tokio::test]
    async fn publish_reaches_every_subscriber_and_drops_closed_ones() {
        let store = SessionStore::new(SessionConfig::default());
        let session = store.create();
        let mut first = session.subscribe();
        let second = session.subscribe();
        drop(second);

        session.publish(&SessionEvent::connected(session.id.clone()));
        // connected replay + the published event.
        let _ = first.recv().await.unwrap();
        let _ = first.recv().await.unwrap();
        assert_eq!(session.subscriber_count(), 1);
    }

    #[tokio::test]
    async fn second_begin_run_conflicts() {
        let store = SessionStore::new(SessionConfig::default());
        let session = store.create();

        let (run_id, _cancel) = session.begin_run().unwrap();
        assert_matches!(session.begin_run(), Err(QuillError::Conflict(_)));

        session.finish_run(&run_id);
        assert!(session.begin_run().is_ok());
    }

    #[tokio::test]
    async fn finish_run_ignores_a_stale_run_id() {
        let store = SessionStore::new(SessionConfig::default());
        let session = store.create();

        let (run_id, _cancel) = session.begin_run().unwrap();
        session.finish_run(&RunId::new());
        assert_eq!(session.active_run_id(), Some(run_id.clone()));
        session.finish_run(&run_id);
        assert_eq!(session.active_run_id(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn idle_sessions_are_swept_on_create() {
        let store = SessionStore::new(SessionConfig::default());
        let idle = store.create();
        let busy = store.create();
        let (_run_id, _cancel) = busy.begin_run().unwrap();

        tokio::time::advance(Duration::from_secs(31 * 60)).await;
        let fresh = store.create();

        assert!(store.get(&idle.id).is_err());
        assert!(store.get(&busy.id).is_ok(), "active run defers the sweep");
        assert!(store.get(&fresh.id).is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn touch_defers_the_sweep() {
        let store = SessionStore::new(SessionConfig::default());
        let session = store.create();

        tokio::time::advance(Duration::from_secs(29 * 60)).await;
        session.touch();
        tokio::time::advance(Duration::from_secs(2 * 60)).await;
        let _ = store.create();

        assert!(store.get(&session.id).is_ok());
    }
}
