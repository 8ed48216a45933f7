//! HTTP/SSE routes.
//!
//! The session surface is four endpoints plus a health check: create a
//! session, subscribe to its event stream, start a run, and submit tool
//! results for an outstanding request. Every error leaves as a JSON
//! `{code, message}` body with the status [`crate::error::status_for`] maps.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::{get, post};
use serde::{Deserialize, Serialize};
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::{Stream, StreamExt};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use quill_core::{ChatMessage, RequestId, RunId, SessionId, ToolObservation};
use quill_doc::Document;
use quill_session::SessionOrchestrator;

use crate::error::ApiError;
use crate::host::DocumentHost;

/// Shared state accessible from handlers.
#[derive(Clone)]
pub struct AppState {
    /// The orchestrator driving every session.
    pub orchestrator: Arc<SessionOrchestrator>,
    /// When the server started.
    pub start_time: Instant,
}

impl AppState {
    /// Wrap an orchestrator for serving.
    #[must_use]
    pub fn new(orchestrator: Arc<SessionOrchestrator>) -> Self {
        Self {
            orchestrator,
            start_time: Instant::now(),
        }
    }
}

/// Build the router with all routes.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/sessions", post(create_session))
        .route("/sessions/{id}/events", get(session_events))
        .route("/sessions/{id}/runs", post(start_run))
        .route("/sessions/{id}/tool-results", post(submit_tool_results))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
    sessions: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionCreated {
    session_id: SessionId,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RunRequest {
    messages: Vec<ChatMessage>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RunStarted {
    run_id: RunId,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ToolResultsRequest {
    run_id: RunId,
    request_id: RequestId,
    observations: Vec<ToolObservation>,
}

/// GET /health
async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        uptime_secs: state.start_time.elapsed().as_secs(),
        sessions: state.orchestrator.store().len(),
    })
}

/// POST /sessions
///
/// Creates a session and attaches an in-process [`DocumentHost`] over a
/// fresh empty document, so requested tools execute without an external
/// actor.
async fn create_session(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<SessionCreated>), ApiError> {
    let session_id = state.orchestrator.create_session();
    let _ = DocumentHost::spawn(
        state.orchestrator.clone(),
        session_id.clone(),
        Document::new(),
    )?;
    info!(session_id = %session_id, "session created");
    Ok((StatusCode::CREATED, Json(SessionCreated { session_id })))
}

/// GET /sessions/{id}/events
async fn session_events(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let rx = state.orchestrator.subscribe(&SessionId::from(id))?;
    let stream = ReceiverStream::new(rx).map(|event| {
        let frame = Event::default().event(event.event_type());
        Ok(frame
            .json_data(&event)
            .unwrap_or_else(|_| Event::default().comment("unserializable event")))
    });
    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

/// POST /sessions/{id}/runs
async fn start_run(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<RunRequest>,
) -> Result<(StatusCode, Json<RunStarted>), ApiError> {
    let run_id = state
        .orchestrator
        .start_run(&SessionId::from(id), body.messages)?;
    Ok((StatusCode::ACCEPTED, Json(RunStarted { run_id })))
}

/// POST /sessions/{id}/tool-results
async fn submit_tool_results(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<ToolResultsRequest>,
) -> Result<StatusCode, ApiError> {
    state.orchestrator.submit_tool_results(
        &SessionId::from(id),
        &body.run_id,
        &body.request_id,
        body.observations,
    )?;
    Ok(StatusCode::ACCEPTED)
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::Request;
    use quill_session::{ProviderTurn, ScriptedProvider, SessionConfig, SessionStore};
    use tower::ServiceExt;

    use super::*;

    fn app(turns: impl IntoIterator<Item = ProviderTurn>) -> Router {
        let store = Arc::new(SessionStore::new(SessionConfig::default()));
        let orchestrator = Arc::new(SessionOrchestrator::new(
            store,
            Arc::new(ScriptedProvider::new(turns)),
        ));
        router(AppState::new(orchestrator))
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), 64 * 1024)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let app = app([]);
        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["status"], "ok");
        assert_eq!(json["sessions"], 0);
    }

    #[tokio::test]
    async fn create_session_returns_an_id() {
        let app = app([]);
        let response = app
            .oneshot(Request::post("/sessions").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let json = body_json(response).await;
        assert!(json["sessionId"].as_str().is_some_and(|s| !s.is_empty()));
    }

    #[tokio::test]
    async fn events_for_an_unknown_session_is_404() {
        let app = app([]);
        let response = app
            .oneshot(
                Request::get("/sessions/nope/events")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let json = body_json(response).await;
        assert_eq!(json["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn run_on_an_unknown_session_is_404() {
        let app = app([]);
        let response = app
            .oneshot(
                Request::post("/sessions/nope/runs")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"messages": [{"role": "user", "content": "hi"}]}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn empty_seed_messages_are_a_400() {
        let app = app([ProviderTurn::text("unused")]);
        let created = app
            .clone()
            .oneshot(Request::post("/sessions").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let session_id = body_json(created).await["sessionId"]
            .as_str()
            .unwrap()
            .to_owned();

        let response = app
            .oneshot(
                Request::post(format!("/sessions/{session_id}/runs"))
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"messages": []}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn stale_tool_results_are_a_404() {
        let app = app([]);
        let created = app
            .clone()
            .oneshot(Request::post("/sessions").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let session_id = body_json(created).await["sessionId"]
            .as_str()
            .unwrap()
            .to_owned();

        let body = serde_json::json!({
            "runId": "run-x",
            "requestId": "req-x",
            "observations": []
        });
        let response = app
            .oneshot(
                Request::post(format!("/sessions/{session_id}/tool-results"))
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn event_stream_has_the_sse_content_type() {
        let app = app([]);
        let created = app
            .clone()
            .oneshot(Request::post("/sessions").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let session_id = body_json(created).await["sessionId"]
            .as_str()
            .unwrap()
            .to_owned();

        let response = app
            .oneshot(
                Request::get(format!("/sessions/{session_id}/events"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let content_type = response.headers()["content-type"].to_str().unwrap();
        assert!(content_type.starts_with("text/event-stream"));
    }
}
