//! In-process document host.
//!
//! When the server holds the document itself, this subscriber task stands in
//! for the external tool-execution actor: it watches a session's event stream
//! and answers every `tools.requested` batch by running the calls against a
//! locally held [`DocumentEngine`] and submitting the observations back.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use quill_core::{QuillResult, SessionEvent, SessionId};
use quill_doc::Document;
use quill_engine::DocumentEngine;
use quill_session::SessionOrchestrator;

/// Executes requested tools against a locally held document.
pub struct DocumentHost {
    orchestrator: Arc<SessionOrchestrator>,
    session_id: SessionId,
    engine: Mutex<DocumentEngine>,
}

impl DocumentHost {
    /// Subscribe to `session_id` and spawn the execution loop over `document`.
    pub fn spawn(
        orchestrator: Arc<SessionOrchestrator>,
        session_id: SessionId,
        document: Document,
    ) -> QuillResult<JoinHandle<()>> {
        let events = orchestrator.subscribe(&session_id)?;
        let host = Self {
            orchestrator,
            session_id,
            engine: Mutex::new(DocumentEngine::new(document)),
        };
        Ok(tokio::spawn(host.run(events)))
    }

    async fn run(self, mut events: mpsc::Receiver<SessionEvent>) {
        while let Some(event) = events.recv().await {
            let SessionEvent::ToolsRequested {
                run_id,
                request_id,
                tool_calls,
                ..
            } = event
            else {
                continue;
            };
            let observations = {
                let mut engine = self.engine.lock();
                tool_calls
                    .iter()
                    .map(|call| engine.execute_call(call))
                    .collect()
            };
            debug!(
                session_id = %self.session_id,
                request_id = %request_id,
                calls = tool_calls.len(),
                "tool batch executed"
            );
            if let Err(err) = self.orchestrator.submit_tool_results(
                &self.session_id,
                &run_id,
                &request_id,
                observations,
            ) {
                // The run may have timed out or been torn down meanwhile.
                warn!(
                    session_id = %self.session_id,
                    request_id = %request_id,
                    error = %err,
                    "tool results rejected"
                );
            }
        }
        debug!(session_id = %self.session_id, "document host stopped");
    }
}
