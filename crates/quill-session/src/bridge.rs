//! Correlation table for outstanding tool requests.
//!
//! When a round produces tool calls, the orchestrator registers a request
//! here and publishes `tools.requested`. The actor holding the document
//! executes the batch and submits observations against the request ID; the
//! table routes them back to the awaiting round through a oneshot channel.

use dashmap::DashMap;
use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::debug;

use quill_core::{QuillError, QuillResult, RequestId, RunId, ToolObservation};

struct PendingRequest {
    run_id: RunId,
    tx: oneshot::Sender<Vec<ToolObservation>>,
    registered_at: Instant,
}

/// Pending tool requests, keyed by request ID.
///
/// Entries are removed on resolve, on timeout ([`Self::abandon`]), and on run
/// teardown ([`Self::fail_run`]). A stale submission against a removed entry
/// gets `NotFound`; a submission naming the wrong run gets `Conflict` and
/// leaves the entry in place.
#[derive(Default)]
pub struct PendingToolRequests {
    pending: DashMap<RequestId, PendingRequest>,
}

impl PendingToolRequests {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new request for `run_id`.
    ///
    /// Returns the request ID to publish and the receiver the round loop
    /// awaits. Dropping the table-side sender (teardown) closes the receiver.
    pub fn register(&self, run_id: &RunId) -> (RequestId, oneshot::Receiver<Vec<ToolObservation>>) {
        let request_id = RequestId::new();
        let (tx, rx) = oneshot::channel();
        let _ = self.pending.insert(
            request_id.clone(),
            PendingRequest {
                run_id: run_id.clone(),
                tx,
                registered_at: Instant::now(),
            },
        );
        debug!(request_id = %request_id, run_id = %run_id, "tool request registered");
        (request_id, rx)
    }

    /// Deliver observations for `request_id`.
    ///
    /// The submitting actor must name the run the request belongs to; a
    /// mismatch is rejected without consuming the entry.
    pub fn resolve(
        &self,
        request_id: &RequestId,
        run_id: &RunId,
        observations: Vec<ToolObservation>,
    ) -> QuillResult<()> {
        {
            let entry = self
                .pending
                .get(request_id)
                .ok_or_else(|| QuillError::not_found(request_id.as_str()))?;
            if entry.run_id != *run_id {
                return Err(QuillError::Conflict(format!(
                    "request {request_id} belongs to run {}, not {run_id}",
                    entry.run_id
                )));
            }
        }
        let Some((_, pending)) = self.pending.remove(request_id) else {
            return Err(QuillError::not_found(request_id.as_str()));
        };
        let waited_ms = pending.registered_at.elapsed().as_millis();
        debug!(request_id = %request_id, run_id = %run_id, waited_ms, "tool request resolved");
        // The receiver is gone only if the round already timed out; the entry
        // would have been abandoned first, so this send does not fail in
        // practice. Either way the submission was accepted.
        let _ = pending.tx.send(observations);
        Ok(())
    }

    /// Drop `request_id` without delivering anything (timeout path).
    pub fn abandon(&self, request_id: &RequestId) {
        if self.pending.remove(request_id).is_some() {
            debug!(request_id = %request_id, "tool request abandoned");
        }
    }

    /// Reject and remove every pending entry belonging to `run_id`.
    ///
    /// Dropping the senders closes the receivers, so any round still awaiting
    /// one observes "terminated before pending tool request completed".
    pub fn fail_run(&self, run_id: &RunId) {
        let before = self.pending.len();
        self.pending.retain(|_, entry| entry.run_id != *run_id);
        let rejected = before - self.pending.len();
        if rejected > 0 {
            debug!(run_id = %run_id, rejected, "pending tool requests rejected");
        }
    }

    /// Number of outstanding requests.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether no requests are outstanding.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use quill_core::ToolCallId;

    use super::*;

    fn observation(content: &str) -> ToolObservation {
        ToolObservation {
            tool_call_id: ToolCallId::new(),
            content: content.into(),
            is_error: false,
        }
    }

    #[tokio::test]
    async fn resolve_delivers_to_the_receiver() {
        let table = PendingToolRequests::new();
        let run_id = RunId::new();
        let (request_id, rx) = table.register(&run_id);

        table
            .resolve(&request_id, &run_id, vec![observation("{\"revision\":\"1-a\"}")])
            .unwrap();
        let delivered = rx.await.unwrap();
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].content, "{\"revision\":\"1-a\"}");
        assert!(table.is_empty());
    }

    #[tokio::test]
    async fn unknown_request_is_not_found() {
        let table = PendingToolRequests::new();
        let err = table
            .resolve(&RequestId::new(), &RunId::new(), vec![])
            .unwrap_err();
        assert_matches!(err, QuillError::NotFound { .. });
    }

    #[tokio::test]
    async fn wrong_run_is_a_conflict_and_keeps_the_entry() {
        let table = PendingToolRequests::new();
        let run_id = RunId::new();
        let (request_id, rx) = table.register(&run_id);

        let err = table
            .resolve(&request_id, &RunId::new(), vec![observation("x")])
            .unwrap_err();
        assert_matches!(err, QuillError::Conflict(_));
        assert_eq!(table.len(), 1);

        // The right run can still resolve it.
        table
            .resolve(&request_id, &run_id, vec![observation("x")])
            .unwrap();
        assert_eq!(rx.await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn fail_run_closes_receivers_and_clears_entries() {
        let table = PendingToolRequests::new();
        let doomed = RunId::new();
        let survivor = RunId::new();
        let (_, doomed_rx) = table.register(&doomed);
        let (_, _survivor_rx) = table.register(&survivor);

        table.fail_run(&doomed);
        assert_eq!(table.len(), 1);
        assert!(doomed_rx.await.is_err());
    }

    #[tokio::test]
    async fn abandoned_request_rejects_late_submission() {
        let table = PendingToolRequests::new();
        let run_id = RunId::new();
        let (request_id, _rx) = table.register(&run_id);

        table.abandon(&request_id);
        let err = table
            .resolve(&request_id, &run_id, vec![observation("late")])
            .unwrap_err();
        assert_matches!(err, QuillError::NotFound { .. });
    }
}
