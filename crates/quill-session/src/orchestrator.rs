//! The run state machine.
//!
//! A run is a sequence of rounds over one session. Each round streams a
//! provider turn (`assistant.delta` fragments, then `assistant.turn`), and
//! either finishes the run (`run.completed`) or publishes `tools.requested`
//! and blocks until the document-side actor submits observations. The wait is
//! bounded by the configured tool timeout; timing out, exceeding the round
//! cap, or a provider error fails the run (`run.failed`). Exactly one run may
//! be active per session at a time.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use quill_core::{
    ChatMessage, QuillError, QuillResult, RequestId, RunId, SessionEvent, SessionId,
    ToolObservation,
};
use quill_engine::{ToolDefinition, ToolRegistry};

use crate::provider::ModelProvider;
use crate::store::{Session, SessionConfig, SessionStore};

/// Drives runs over the sessions in a [`SessionStore`].
pub struct SessionOrchestrator {
    store: Arc<SessionStore>,
    provider: Arc<dyn ModelProvider>,
    tools: Vec<ToolDefinition>,
}

impl SessionOrchestrator {
    /// Create an orchestrator exposing the built-in tool set.
    #[must_use]
    pub fn new(store: Arc<SessionStore>, provider: Arc<dyn ModelProvider>) -> Self {
        Self {
            store,
            provider,
            tools: ToolRegistry::builtin().definitions(),
        }
    }

    /// The session registry this orchestrator drives.
    #[must_use]
    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    /// Create a new session.
    pub fn create_session(&self) -> SessionId {
        self.store.create().id.clone()
    }

    /// Attach a subscriber to a session's event stream.
    pub fn subscribe(&self, session_id: &SessionId) -> QuillResult<mpsc::Receiver<SessionEvent>> {
        Ok(self.store.get(session_id)?.subscribe())
    }

    /// Start a run seeded with `messages`.
    ///
    /// Returns immediately with the run ID; rounds execute on a spawned task
    /// and surface through the session's event stream. Fails with `Conflict`
    /// while another run is active on the session.
    #[instrument(skip(self, messages), fields(session_id = %session_id))]
    pub fn start_run(
        &self,
        session_id: &SessionId,
        messages: Vec<ChatMessage>,
    ) -> QuillResult<RunId> {
        if messages.is_empty() {
            return Err(QuillError::Validation(
                "a run needs at least one seed message".into(),
            ));
        }
        let session = self.store.get(session_id)?;
        session.touch();
        let (run_id, cancel) = session.begin_run()?;
        info!(run_id = %run_id, "run started");

        let runner = RunTask {
            session,
            provider: self.provider.clone(),
            tools: self.tools.clone(),
            config: *self.store.config(),
            run_id: run_id.clone(),
            cancel,
        };
        drop(tokio::spawn(runner.run(messages)));
        Ok(run_id)
    }

    /// Submit tool observations for an outstanding request.
    pub fn submit_tool_results(
        &self,
        session_id: &SessionId,
        run_id: &RunId,
        request_id: &RequestId,
        observations: Vec<ToolObservation>,
    ) -> QuillResult<()> {
        let session = self.store.get(session_id)?;
        session.touch();
        session.pending.resolve(request_id, run_id, observations)
    }
}

/// Everything one spawned run needs.
struct RunTask {
    session: Arc<Session>,
    provider: Arc<dyn ModelProvider>,
    tools: Vec<ToolDefinition>,
    config: SessionConfig,
    run_id: RunId,
    cancel: CancellationToken,
}

impl RunTask {
    async fn run(self, messages: Vec<ChatMessage>) {
        let outcome = self.drive_rounds(messages).await;
        match outcome {
            Ok(()) => {}
            Err(err) => {
                warn!(run_id = %self.run_id, code = err.code(), error = %err, "run failed");
                self.session
                    .publish(&SessionEvent::run_failed(self.run_id.clone(), &err));
            }
        }
        // Teardown clears the active-run claim and rejects leftover requests.
        self.session.finish_run(&self.run_id);
    }

    async fn drive_rounds(&self, mut messages: Vec<ChatMessage>) -> QuillResult<()> {
        for round in 0..self.config.max_rounds {
            let turn = self.stream_turn(round, &messages).await?;
            self.session.publish(&SessionEvent::turn(
                self.run_id.clone(),
                round,
                turn.assistant_text.clone(),
                turn.tool_calls.clone(),
            ));
            let tool_calls = if turn.tool_calls.is_empty() {
                None
            } else {
                Some(turn.tool_calls.clone())
            };
            messages.push(ChatMessage::assistant(
                turn.assistant_text.clone(),
                tool_calls,
            ));

            if turn.tool_calls.is_empty() {
                info!(run_id = %self.run_id, rounds = round + 1, "run completed");
                self.session.publish(&SessionEvent::run_completed(
                    self.run_id.clone(),
                    turn.assistant_text,
                    messages,
                    round + 1,
                ));
                return Ok(());
            }

            let (request_id, rx) = self.session.pending.register(&self.run_id);
            self.session.publish(&SessionEvent::tools_requested(
                self.run_id.clone(),
                request_id.clone(),
                round,
                turn.tool_calls,
            ));
            let observations = self.await_observations(&request_id, rx).await?;
            debug!(
                run_id = %self.run_id,
                round,
                observations = observations.len(),
                "tool round resolved"
            );
            messages.push(ChatMessage::tool(observations));
        }
        Err(QuillError::Internal(format!(
            "run exceeded the {} round cap",
            self.config.max_rounds
        )))
    }

    /// One provider turn, with deltas forwarded to subscribers as they land.
    async fn stream_turn(
        &self,
        round: u32,
        messages: &[ChatMessage],
    ) -> QuillResult<crate::provider::ProviderTurn> {
        let (delta_tx, mut delta_rx) = mpsc::channel::<String>(64);
        let forwarder = {
            let session = self.session.clone();
            let run_id = self.run_id.clone();
            tokio::spawn(async move {
                while let Some(fragment) = delta_rx.recv().await {
                    session.publish(&SessionEvent::delta(run_id.clone(), round, fragment));
                }
            })
        };
        let result = self.provider.complete(messages, &self.tools, delta_tx).await;
        // The sender is dropped by now, so the forwarder drains and exits.
        let _ = forwarder.await;
        result
    }

    async fn await_observations(
        &self,
        request_id: &RequestId,
        rx: oneshot::Receiver<Vec<ToolObservation>>,
    ) -> QuillResult<Vec<ToolObservation>> {
        let timeout = self.config.tool_timeout();
        tokio::select! {
            () = self.cancel.cancelled() => {
                self.session.pending.abandon(request_id);
                Err(QuillError::Conflict(
                    "run cancelled while awaiting tool results".into(),
                ))
            }
            outcome = tokio::time::timeout(timeout, rx) => match outcome {
                Ok(Ok(observations)) => Ok(observations),
                Ok(Err(_)) => Err(QuillError::Internal(
                    "terminated before pending tool request completed".into(),
                )),
                Err(_) => {
                    self.session.pending.abandon(request_id);
                    Err(QuillError::Timeout {
                        request_id: request_id.to_string(),
                        timeout_ms: timeout_ms(timeout),
                    })
                }
            },
        }
    }
}

#[allow(clippy::cast_possible_truncation)]
fn timeout_ms(timeout: Duration) -> u64 {
    timeout.as_millis() as u64
}
