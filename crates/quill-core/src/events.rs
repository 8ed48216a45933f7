//! Session event wire types.
//!
//! Every message pushed to a session subscriber is one [`SessionEvent`],
//! serialized as a single JSON object tagged by `type`. Payload fields are
//! camelCase. Constructors stamp an RFC-3339 millisecond timestamp.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::QuillError;
use crate::ids::{RequestId, RunId, SessionId, ToolCallId};

/// One tool invocation requested by the model.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCall {
    /// Call identifier, unique within the round.
    pub id: ToolCallId,
    /// Tool name, e.g. `search_elements`.
    pub name: String,
    /// JSON arguments object.
    pub arguments: Value,
}

/// The outcome of executing one tool call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolObservation {
    /// The call this observation answers.
    pub tool_call_id: ToolCallId,
    /// Result content (JSON text or an error message).
    pub content: String,
    /// Whether the tool failed.
    #[serde(default)]
    pub is_error: bool,
}

/// Who authored a chat message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// End-user input.
    User,
    /// Model output.
    Assistant,
    /// Tool observations fed back to the model.
    Tool,
}

/// One entry in a run's conversation transcript.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    /// Message author.
    pub role: Role,
    /// Message text.
    pub content: String,
    /// Tool calls attached to an assistant message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    /// Observations attached to a tool message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observations: Option<Vec<ToolObservation>>,
}

impl ChatMessage {
    /// A plain user message.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            tool_calls: None,
            observations: None,
        }
    }

    /// An assistant message, optionally carrying tool calls.
    #[must_use]
    pub fn assistant(content: impl Into<String>, tool_calls: Option<Vec<ToolCall>>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            tool_calls,
            observations: None,
        }
    }

    /// A tool message carrying observations.
    #[must_use]
    pub fn tool(observations: Vec<ToolObservation>) -> Self {
        Self {
            role: Role::Tool,
            content: String::new(),
            tool_calls: None,
            observations: Some(observations),
        }
    }
}

/// Structured error payload for `run.failed`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Machine-readable code, e.g. `TIMEOUT`.
    pub code: String,
    /// Human-readable message.
    pub message: String,
}

impl From<&QuillError> for ErrorBody {
    fn from(err: &QuillError) -> Self {
        Self {
            code: err.code().to_owned(),
            message: err.to_string(),
        }
    }
}

/// Server-pushed session event, tagged by `type`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum SessionEvent {
    /// Replayed to every new subscriber immediately on attach.
    #[serde(rename = "session.connected")]
    SessionConnected {
        /// The session the stream belongs to.
        session_id: SessionId,
        /// RFC-3339 millisecond timestamp.
        timestamp: String,
    },

    /// Incremental assistant text during streaming.
    #[serde(rename = "assistant.delta")]
    AssistantDelta {
        /// Owning run.
        run_id: RunId,
        /// Zero-based round index.
        round: u32,
        /// Text fragment.
        text_delta: String,
        /// RFC-3339 millisecond timestamp.
        timestamp: String,
    },

    /// One completed model turn.
    #[serde(rename = "assistant.turn")]
    AssistantTurn {
        /// Owning run.
        run_id: RunId,
        /// Zero-based round index.
        round: u32,
        /// Full assistant text for the turn.
        assistant_text: String,
        /// Tool calls the model requested this turn.
        tool_calls: Vec<ToolCall>,
        /// RFC-3339 millisecond timestamp.
        timestamp: String,
    },

    /// Tool calls awaiting execution by the document-side actor.
    #[serde(rename = "tools.requested")]
    ToolsRequested {
        /// Owning run.
        run_id: RunId,
        /// Correlation ID the results must be submitted against.
        request_id: RequestId,
        /// Zero-based round index.
        round: u32,
        /// The batch to execute.
        tool_calls: Vec<ToolCall>,
        /// RFC-3339 millisecond timestamp.
        timestamp: String,
    },

    /// Terminal success.
    #[serde(rename = "run.completed")]
    RunCompleted {
        /// The finished run.
        run_id: RunId,
        /// Final assistant text.
        assistant_text: String,
        /// Full transcript of the run.
        messages: Vec<ChatMessage>,
        /// Number of rounds executed.
        rounds: u32,
        /// RFC-3339 millisecond timestamp.
        timestamp: String,
    },

    /// Terminal failure.
    #[serde(rename = "run.failed")]
    RunFailed {
        /// The failed run.
        run_id: RunId,
        /// What went wrong.
        error: ErrorBody,
        /// RFC-3339 millisecond timestamp.
        timestamp: String,
    },
}

fn now_rfc3339_millis() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

impl SessionEvent {
    /// Build a `session.connected` event.
    #[must_use]
    pub fn connected(session_id: SessionId) -> Self {
        Self::SessionConnected {
            session_id,
            timestamp: now_rfc3339_millis(),
        }
    }

    /// Build an `assistant.delta` event.
    #[must_use]
    pub fn delta(run_id: RunId, round: u32, text_delta: impl Into<String>) -> Self {
        Self::AssistantDelta {
            run_id,
            round,
            text_delta: text_delta.into(),
            timestamp: now_rfc3339_millis(),
        }
    }

    /// Build an `assistant.turn` event.
    #[must_use]
    pub fn turn(
        run_id: RunId,
        round: u32,
        assistant_text: impl Into<String>,
        tool_calls: Vec<ToolCall>,
    ) -> Self {
        Self::AssistantTurn {
            run_id,
            round,
            assistant_text: assistant_text.into(),
            tool_calls,
            timestamp: now_rfc3339_millis(),
        }
    }

    /// Build a `tools.requested` event.
    #[must_use]
    pub fn tools_requested(
        run_id: RunId,
        request_id: RequestId,
        round: u32,
        tool_calls: Vec<ToolCall>,
    ) -> Self {
        Self::ToolsRequested {
            run_id,
            request_id,
            round,
            tool_calls,
            timestamp: now_rfc3339_millis(),
        }
    }

    /// Build a `run.completed` event.
    #[must_use]
    pub fn run_completed(
        run_id: RunId,
        assistant_text: impl Into<String>,
        messages: Vec<ChatMessage>,
        rounds: u32,
    ) -> Self {
        Self::RunCompleted {
            run_id,
            assistant_text: assistant_text.into(),
            messages,
            rounds,
            timestamp: now_rfc3339_millis(),
        }
    }

    /// Build a `run.failed` event from an error.
    #[must_use]
    pub fn run_failed(run_id: RunId, error: &QuillError) -> Self {
        Self::RunFailed {
            run_id,
            error: ErrorBody::from(error),
            timestamp: now_rfc3339_millis(),
        }
    }

    /// The wire `type` tag of this event.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::SessionConnected { .. } => "session.connected",
            Self::AssistantDelta { .. } => "assistant.delta",
            Self::AssistantTurn { .. } => "assistant.turn",
            Self::ToolsRequested { .. } => "tools.requested",
            Self::RunCompleted { .. } => "run.completed",
            Self::RunFailed { .. } => "run.failed",
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn connected_wire_shape() {
        let event = SessionEvent::connected(SessionId::from("sess-1"));
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "session.connected");
        assert_eq!(value["sessionId"], "sess-1");
        assert!(value["timestamp"].is_string());
    }

    #[test]
    fn delta_wire_shape() {
        let event = SessionEvent::delta(RunId::from("run-1"), 0, "Hel");
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "assistant.delta");
        assert_eq!(value["runId"], "run-1");
        assert_eq!(value["round"], 0);
        assert_eq!(value["textDelta"], "Hel");
    }

    #[test]
    fn tools_requested_wire_shape() {
        let call = ToolCall {
            id: ToolCallId::from("call-1"),
            name: "list_elements".into(),
            arguments: json!({"kinds": ["paragraph"]}),
        };
        let event = SessionEvent::tools_requested(
            RunId::from("run-1"),
            RequestId::from("req-1"),
            2,
            vec![call],
        );
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "tools.requested");
        assert_eq!(value["requestId"], "req-1");
        assert_eq!(value["toolCalls"][0]["name"], "list_elements");
        assert_eq!(value["toolCalls"][0]["arguments"]["kinds"][0], "paragraph");
    }

    #[test]
    fn run_failed_carries_error_code() {
        let err = QuillError::Timeout {
            request_id: "req-9".into(),
            timeout_ms: 120_000,
        };
        let event = SessionEvent::run_failed(RunId::from("run-1"), &err);
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "run.failed");
        assert_eq!(value["error"]["code"], "TIMEOUT");
        assert!(
            value["error"]["message"]
                .as_str()
                .unwrap()
                .contains("req-9")
        );
    }

    #[test]
    fn event_roundtrip() {
        let event = SessionEvent::run_completed(
            RunId::from("run-1"),
            "done",
            vec![
                ChatMessage::user("hello"),
                ChatMessage::assistant("done", None),
            ],
            1,
        );
        let json = serde_json::to_string(&event).unwrap();
        let back: SessionEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
        assert_eq!(back.event_type(), "run.completed");
    }

    #[test]
    fn chat_message_omits_empty_optionals() {
        let value = serde_json::to_value(ChatMessage::user("hi")).unwrap();
        assert!(value.get("toolCalls").is_none());
        assert!(value.get("observations").is_none());

        let tool = ChatMessage::tool(vec![ToolObservation {
            tool_call_id: ToolCallId::from("call-1"),
            content: "{}".into(),
            is_error: false,
        }]);
        let value = serde_json::to_value(&tool).unwrap();
        assert_eq!(value["role"], "tool");
        assert_eq!(value["observations"][0]["toolCallId"], "call-1");
        assert_eq!(value["observations"][0]["isError"], false);
    }

    #[test]
    fn observation_is_error_defaults_false() {
        let obs: ToolObservation =
            serde_json::from_str(r#"{"toolCallId": "c1", "content": "ok"}"#).unwrap();
        assert!(!obs.is_error);
    }
}
