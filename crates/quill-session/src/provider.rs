//! The model provider seam.
//!
//! The orchestrator is provider-agnostic: anything that can turn a transcript
//! plus tool definitions into an assistant turn plugs in here. Streaming is
//! modeled by a delta sink the provider writes text fragments into while it
//! works.

use std::collections::VecDeque;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use quill_core::{ChatMessage, QuillError, QuillResult, ToolCall};
use quill_engine::ToolDefinition;

/// One completed model turn.
#[derive(Clone, Debug, Default)]
pub struct ProviderTurn {
    /// Full assistant text for the turn.
    pub assistant_text: String,
    /// Tool calls the model wants executed before it continues.
    pub tool_calls: Vec<ToolCall>,
}

impl ProviderTurn {
    /// A text-only turn (ends the run).
    #[must_use]
    pub fn text(assistant_text: impl Into<String>) -> Self {
        Self {
            assistant_text: assistant_text.into(),
            tool_calls: Vec::new(),
        }
    }

    /// A turn that requests tool calls.
    #[must_use]
    pub fn with_tool_calls(assistant_text: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            assistant_text: assistant_text.into(),
            tool_calls,
        }
    }
}

/// A model backend the orchestrator can drive.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Produce the next assistant turn for `messages`.
    ///
    /// Providers should stream text fragments into `deltas` as they arrive;
    /// the sink may be dropped early if no subscriber is listening.
    async fn complete(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
        deltas: mpsc::Sender<String>,
    ) -> QuillResult<ProviderTurn>;
}

/// A provider that replays a fixed sequence of turns.
///
/// Used by tests and by local development setups that have no model backend
/// wired up. Each call pops the next scripted turn; running past the script
/// is an internal error.
#[derive(Default)]
pub struct ScriptedProvider {
    turns: Mutex<VecDeque<ProviderTurn>>,
}

impl ScriptedProvider {
    /// Build a provider that replays `turns` in order.
    #[must_use]
    pub fn new(turns: impl IntoIterator<Item = ProviderTurn>) -> Self {
        Self {
            turns: Mutex::new(turns.into_iter().collect()),
        }
    }

    /// Number of turns left in the script.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.turns.lock().len()
    }
}

#[async_trait]
impl ModelProvider for ScriptedProvider {
    async fn complete(
        &self,
        _messages: &[ChatMessage],
        _tools: &[ToolDefinition],
        deltas: mpsc::Sender<String>,
    ) -> QuillResult<ProviderTurn> {
        let turn = self
            .turns
            .lock()
            .pop_front()
            .ok_or_else(|| QuillError::Internal("scripted provider ran out of turns".into()))?;
        // Stream the text in two fragments to exercise delta handling.
        let text = &turn.assistant_text;
        if !text.is_empty() {
            let mid = text.len() / 2;
            let mid = text
                .char_indices()
                .map(|(i, _)| i)
                .find(|&i| i >= mid)
                .unwrap_or(0);
            let (head, tail) = text.split_at(mid);
            for fragment in [head, tail] {
                if !fragment.is_empty() {
                    let _ = deltas.send(fragment.to_owned()).await;
                }
            }
        }
        Ok(turn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scripted_provider_replays_in_order_and_streams_deltas() {
        let provider = ScriptedProvider::new([
            ProviderTurn::text("first"),
            ProviderTurn::text("second"),
        ]);
        let (tx, mut rx) = mpsc::channel(8);

        let turn = provider.complete(&[], &[], tx).await.unwrap();
        assert_eq!(turn.assistant_text, "first");
        assert_eq!(provider.remaining(), 1);

        let mut streamed = String::new();
        while let Ok(fragment) = rx.try_recv() {
            streamed.push_str(&fragment);
        }
        assert_eq!(streamed, "first");
    }

    #[tokio::test]
    async fn exhausted_script_is_an_internal_error() {
        let provider = ScriptedProvider::new([]);
        let (tx, _rx) = mpsc::channel(8);
        assert!(provider.complete(&[], &[], tx).await.is_err());
    }
}
