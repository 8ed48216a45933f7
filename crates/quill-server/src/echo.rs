//! Fallback provider for running the server without a model backend.

use async_trait::async_trait;
use tokio::sync::mpsc;

use quill_core::{ChatMessage, QuillResult, Role};
use quill_engine::ToolDefinition;
use quill_session::{ModelProvider, ProviderTurn};

/// Echoes the latest user message back as the assistant turn.
///
/// Keeps the full session surface exercisable (streaming, events, runs)
/// when no real model is wired up. Never requests tool calls.
pub struct EchoProvider;

#[async_trait]
impl ModelProvider for EchoProvider {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        _tools: &[ToolDefinition],
        deltas: mpsc::Sender<String>,
    ) -> QuillResult<ProviderTurn> {
        let last_user = messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map_or("", |m| m.content.as_str());
        let text = format!("echo: {last_user}");
        let _ = deltas.send(text.clone()).await;
        Ok(ProviderTurn::text(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn echoes_the_latest_user_message() {
        let (tx, _rx) = mpsc::channel(8);
        let messages = vec![
            ChatMessage::user("first"),
            ChatMessage::assistant("echo: first", None),
            ChatMessage::user("second"),
        ];
        let turn = EchoProvider.complete(&messages, &[], tx).await.unwrap();
        assert_eq!(turn.assistant_text, "echo: second");
        assert!(turn.tool_calls.is_empty());
    }
}
