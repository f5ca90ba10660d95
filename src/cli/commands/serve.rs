//! HTTP API server for integration with other systems.
//!
//! Each session gets its own orchestrator behind its own lock; sessions
//! share only the immutable services.

use crate::cli::Output;
use crate::config::Settings;
use crate::error::ConciergeError;
use crate::events::{AgentEvent, EventSink, NullSink, TraceSink};
use crate::orchestrator::{Orchestrator, Services};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, info, warn};

type Session = Arc<tokio::sync::Mutex<Orchestrator>>;

/// Sessions kept in memory; the least recently used one is dropped beyond this.
const MAX_SESSIONS: usize = 64;

struct SessionEntry {
    orchestrator: Session,
    last_used: u64,
}

/// Shared application state.
struct AppState {
    services: Arc<Services>,
    sessions: Mutex<HashMap<String, SessionEntry>>,
    /// Monotonic use counter for eviction order.
    clock: AtomicU64,
}

impl AppState {
    fn new(services: Arc<Services>) -> Self {
        Self {
            services,
            sessions: Mutex::new(HashMap::new()),
            clock: AtomicU64::new(0),
        }
    }

    /// Look up a session, creating it when the id is new or absent.
    fn session(&self, id: Option<String>) -> (String, Session) {
        let id = id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let mut sessions = match self.sessions.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if !sessions.contains_key(&id) {
            while sessions.len() >= MAX_SESSIONS {
                let Some(oldest) = sessions
                    .iter()
                    .min_by_key(|(_, entry)| entry.last_used)
                    .map(|(key, _)| key.clone())
                else {
                    break;
                };
                debug!("Evicting idle session {}", oldest);
                sessions.remove(&oldest);
            }
            info!("Opening session {}", id);
        }

        let tick = self.clock.fetch_add(1, Ordering::Relaxed);
        let entry = sessions.entry(id.clone()).or_insert_with(|| SessionEntry {
            orchestrator: Arc::new(tokio::sync::Mutex::new(Orchestrator::new(
                self.services.clone(),
            ))),
            last_used: tick,
        });
        entry.last_used = tick;
        (id, entry.orchestrator.clone())
    }

    fn remove(&self, id: &str) -> bool {
        let mut sessions = match self.sessions.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        sessions.remove(id).is_some()
    }
}

/// Run the HTTP API server.
pub async fn run_serve(host: &str, port: u16, settings: Settings) -> anyhow::Result<()> {
    let services = Arc::new(Services::from_settings(&settings)?);
    let app = router(Arc::new(AppState::new(services)));

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    Output::header("Concierge API Server");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    Output::kv("Domain", &settings.agent.domain.to_string());
    println!();
    println!("Endpoints:");
    Output::kv("Health", "GET    /health");
    Output::kv("Answer", "POST   /answer");
    Output::kv("End session", "DELETE /sessions/{id}");
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, app).await?;

    Ok(())
}

fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/answer", post(answer))
        .route("/sessions/{id}", delete(end_session))
        .layer(cors)
        .with_state(state)
}

// === Request/Response Types ===

#[derive(Deserialize)]
struct AnswerRequest {
    request: String,
    #[serde(default)]
    show_reasoning: bool,
    /// Continue an existing conversation. A new session is opened when absent.
    #[serde(default)]
    session_id: Option<String>,
}

#[derive(Serialize)]
struct AnswerResponse {
    answer: String,
    session_id: String,
    /// Tool calls and text deltas, only collected with `show_reasoning`.
    events: Vec<AgentEvent>,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

fn error_response(status: StatusCode, error: String) -> Response {
    (status, Json(ErrorResponse { error })).into_response()
}

// === Handlers ===

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "domain": state.services.domain().to_string(),
    }))
}

async fn answer(State(state): State<Arc<AppState>>, Json(req): Json<AnswerRequest>) -> Response {
    if req.request.trim().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "request must not be empty".into());
    }

    let (session_id, session) = state.session(req.session_id);
    let trace = TraceSink::new();
    let sink: &dyn EventSink = if req.show_reasoning { &trace } else { &NullSink };

    let result = session.lock().await.handle_with_sink(&req.request, sink).await;

    match result {
        Ok(answer) => Json(AnswerResponse {
            answer,
            session_id,
            events: trace.drain(),
        })
        .into_response(),
        Err(e) => {
            warn!("Session {} failed: {}", session_id, e);
            let status = match e {
                ConciergeError::Upstream(_) => StatusCode::BAD_GATEWAY,
                ref e if e.is_fatal() => StatusCode::INTERNAL_SERVER_ERROR,
                _ => StatusCode::UNPROCESSABLE_ENTITY,
            };
            error_response(status, e.to_string())
        }
    }
}

async fn end_session(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
    if state.remove(&id) {
        StatusCode::NO_CONTENT.into_response()
    } else {
        error_response(StatusCode::NOT_FOUND, format!("Session not found: {}", id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AgentSettings, Prompts};
    use crate::formatter::OutputMode;
    use crate::model::ModelReply;
    use crate::testing::{call, FakeFetcher, FakeTranscriber, ScriptedBackend};
    use crate::tools::ToolBox;

    fn state(backend: ScriptedBackend) -> Arc<AppState> {
        let policy = AgentSettings {
            relevance_check: false,
            ..Default::default()
        };
        let toolbox = ToolBox::video(
            Arc::new(FakeFetcher::new("Rust in 100 Seconds")),
            Arc::new(FakeTranscriber::new("Rust is fast.")),
            OutputMode::Text,
            policy.formatter_return_mode,
        )
        .unwrap();
        let services = Services::new(Arc::new(backend), toolbox, Prompts::default(), policy);
        Arc::new(AppState::new(Arc::new(services)))
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn request(text: &str, show_reasoning: bool, session_id: Option<&str>) -> Json<AnswerRequest> {
        Json(AnswerRequest {
            request: text.to_string(),
            show_reasoning,
            session_id: session_id.map(String::from),
        })
    }

    #[tokio::test]
    async fn test_answer_opens_session() {
        let state = state(ScriptedBackend::new(vec![ModelReply::text("Hello there.")]));

        let response = answer(State(state.clone()), request("Hi", false, None)).await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["answer"], "Hello there.");
        assert!(body["events"].as_array().unwrap().is_empty());

        let session_id = body["session_id"].as_str().unwrap();
        assert!(state.sessions.lock().unwrap().contains_key(session_id));
    }

    #[tokio::test]
    async fn test_answer_with_reasoning_returns_events() {
        let state = state(ScriptedBackend::new(vec![
            ModelReply::calls(vec![call(
                "c1",
                "download_youtube_audio",
                r#"{"url": "https://www.youtube.com/watch?v=5C_HPTJg5ek"}"#,
            )]),
            ModelReply::text("Downloaded."),
        ]));

        let response = answer(State(state), request("Get the audio", true, None)).await;
        let body = body_json(response).await;

        let events = body["events"].as_array().unwrap();
        assert_eq!(events[0]["type"], "tool_call");
        assert_eq!(events[0]["name"], "download_youtube_audio");
        assert_eq!(events[0]["success"], true);
        assert_eq!(events.last().unwrap()["type"], "text_delta");
        assert_eq!(body["answer"], "Downloaded.");
    }

    #[tokio::test]
    async fn test_sessions_keep_separate_history() {
        let backend = Arc::new(ScriptedBackend::new(vec![
            ModelReply::text("First."),
            ModelReply::text("Second."),
            ModelReply::text("Third."),
        ]));
        let policy = AgentSettings {
            relevance_check: false,
            ..Default::default()
        };
        let toolbox = ToolBox::video(
            Arc::new(FakeFetcher::new("t")),
            Arc::new(FakeTranscriber::new("t")),
            OutputMode::Text,
            policy.formatter_return_mode,
        )
        .unwrap();
        let services = Services::new(backend.clone(), toolbox, Prompts::default(), policy);
        let state = Arc::new(AppState::new(Arc::new(services)));

        answer(State(state.clone()), request("one", false, Some("a"))).await;
        answer(State(state.clone()), request("two", false, Some("a"))).await;
        answer(State(state.clone()), request("three", false, Some("b"))).await;

        let calls = backend.generate_calls();
        // system + scoped user
        assert_eq!(calls[0].len(), 2);
        // system + one replayed turn + scoped user
        assert_eq!(calls[1].len(), 4);
        assert_eq!(calls[2].len(), 2);
    }

    #[tokio::test]
    async fn test_upstream_failure_is_bad_gateway() {
        let state = state(ScriptedBackend::new(Vec::new()));

        let response = answer(State(state), request("Hi", false, None)).await;
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body = body_json(response).await;
        assert!(body["error"].as_str().unwrap().contains("script exhausted"));
    }

    #[tokio::test]
    async fn test_empty_request_rejected() {
        let state = state(ScriptedBackend::new(Vec::new()));
        let response = answer(State(state), request("  ", false, None)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_end_session() {
        let state = state(ScriptedBackend::new(Vec::new()));
        state.session(Some("abc".into()));

        let response = end_session(State(state.clone()), Path("abc".into())).await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = end_session(State(state), Path("abc".into())).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_anonymous_requests_keep_session_map_bounded() {
        let replies = (0..100).map(|i| ModelReply::text(format!("Answer {}", i))).collect();
        let state = state(ScriptedBackend::new(replies));

        for _ in 0..100 {
            let response = answer(State(state.clone()), request("Hi", false, None)).await;
            assert_eq!(response.status(), StatusCode::OK);
        }

        assert_eq!(state.sessions.lock().unwrap().len(), MAX_SESSIONS);
    }

    #[tokio::test]
    async fn test_eviction_drops_least_recently_used() {
        let state = state(ScriptedBackend::new(Vec::new()));
        for i in 0..MAX_SESSIONS {
            state.session(Some(format!("s{}", i)));
        }
        // Touch the oldest so the next one in line is evicted instead.
        state.session(Some("s0".into()));
        state.session(Some("new".into()));

        let sessions = state.sessions.lock().unwrap();
        assert_eq!(sessions.len(), MAX_SESSIONS);
        assert!(sessions.contains_key("s0"));
        assert!(!sessions.contains_key("s1"));
        assert!(sessions.contains_key("new"));
    }
}
