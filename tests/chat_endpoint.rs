//! HTTP chat endpoint tests: the full router exercised with
//! `tower::ServiceExt::oneshot` and a stub completion backend.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use tower::ServiceExt;
use uuid::Uuid;

use embercoach::coach::CoachService;
use embercoach::db;
use embercoach::llm::{Completion, CompletionBackend, CompletionError, PromptMessage, Usage};
use embercoach::providers::SqliteProviders;
use embercoach::server::{create_router, AppState};
use embercoach::session::SessionStore;

#[derive(Clone, Copy)]
enum StubMode {
    Reply(&'static str),
    RateLimited,
    QuotaExceeded,
    Transient,
}

struct StubBackend {
    mode: StubMode,
    calls: AtomicUsize,
}

#[async_trait]
impl CompletionBackend for StubBackend {
    async fn complete(&self, _messages: &[PromptMessage]) -> Result<Completion, CompletionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.mode {
            StubMode::Reply(text) => Ok(Completion {
                text: text.to_string(),
                usage: Some(Usage { prompt_tokens: 42, completion_tokens: 12, total_tokens: 54 }),
            }),
            StubMode::RateLimited => Err(CompletionError::RateLimited),
            StubMode::QuotaExceeded => Err(CompletionError::QuotaExceeded),
            StubMode::Transient => Err(CompletionError::Transient("timeout".to_string())),
        }
    }

    fn name(&self) -> &'static str {
        "stub"
    }
}

async fn test_app(mode: StubMode) -> (Router, Arc<StubBackend>, SqlitePool) {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("create in-memory sqlite");
    db::init_schema(&pool).await.expect("bootstrap schema");

    let providers = Arc::new(SqliteProviders::new(pool.clone()));
    let stub = Arc::new(StubBackend { mode, calls: AtomicUsize::new(0) });
    let coach = Arc::new(CoachService::new(
        SessionStore::new(pool.clone()),
        providers.clone(),
        providers.clone(),
        providers,
        stub.clone(),
    ));

    (create_router(AppState { coach }), stub, pool)
}

fn chat_request(body: Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/api/coach/chat")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn chat_round_trip_returns_reply_and_classification() {
    let (app, _stub, _pool) = test_app(StubMode::Reply("Three days is real progress.")).await;

    let response = app
        .oneshot(chat_request(json!({
            "message": "3 days clean!",
            "userId": Uuid::new_v4().to_string(),
            "sessionId": "session-1",
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["response"], "Three days is real progress.");
    assert_eq!(body["sentiment"], "positive");
    assert_eq!(body["riskLevel"], "low");
    assert_eq!(body["topics"], json!([]));
    assert_eq!(body["usage"]["total_tokens"], 54);
}

#[tokio::test]
async fn malformed_user_id_is_rejected_before_any_backend_access() {
    let (app, stub, pool) = test_app(StubMode::Reply("unreachable")).await;

    let response = app
        .oneshot(chat_request(json!({
            "message": "hello",
            "userId": "not-a-uuid",
            "sessionId": "session-1",
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert!(body["error"].as_str().unwrap().contains("UUID"));

    // Neither the completion backend nor storage was touched.
    assert_eq!(stub.calls.load(Ordering::SeqCst), 0);
    let sessions: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM coach_sessions")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(sessions.0, 0);
}

#[tokio::test]
async fn missing_message_is_a_400_with_reason() {
    let (app, _stub, _pool) = test_app(StubMode::Reply("unreachable")).await;

    let response = app
        .oneshot(chat_request(json!({
            "userId": Uuid::new_v4().to_string(),
            "sessionId": "session-1",
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["error"], "message is required");
}

#[tokio::test]
async fn backend_timeout_still_returns_200_with_a_reply() {
    let (app, _stub, _pool) = test_app(StubMode::Transient).await;

    let response = app
        .oneshot(chat_request(json!({
            "message": "rough evening",
            "userId": Uuid::new_v4().to_string(),
            "sessionId": "session-1",
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    let reply = body["response"].as_str().unwrap();
    assert!(!reply.is_empty());
    // Degraded mode stays invisible to the end user.
    assert!(!reply.to_lowercase().contains("unavailable"));
}

#[tokio::test]
async fn rate_limit_surfaces_as_429_with_a_canned_reply() {
    let (app, _stub, _pool) = test_app(StubMode::RateLimited).await;

    let response = app
        .oneshot(chat_request(json!({
            "message": "hello",
            "userId": Uuid::new_v4().to_string(),
            "sessionId": "session-1",
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    let body = json_body(response).await;
    assert!(!body["response"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn quota_exhaustion_surfaces_as_503() {
    let (app, _stub, _pool) = test_app(StubMode::QuotaExceeded).await;

    let response = app
        .oneshot(chat_request(json!({
            "message": "hello",
            "userId": Uuid::new_v4().to_string(),
            "sessionId": "session-1",
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn preflight_gets_open_cors_headers() {
    let (app, _stub, _pool) = test_app(StubMode::Reply("ok")).await;

    let response = app
        .oneshot(
            Request::builder()
                .method(Method::OPTIONS)
                .uri("/api/coach/chat")
                .header(header::ORIGIN, "https://app.example")
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .map(|v| v.to_str().unwrap()),
        Some("*")
    );
}

#[tokio::test]
async fn crisis_chat_sets_the_intervention_flag_end_to_end() {
    let (app, _stub, pool) = test_app(StubMode::Reply("You matter. Please reach out.")).await;

    let response = app
        .oneshot(chat_request(json!({
            "message": "I want to hurt myself",
            "userId": Uuid::new_v4().to_string(),
            "sessionId": "session-1",
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["sentiment"], "crisis");
    assert_eq!(body["riskLevel"], "critical");

    let flagged: (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM coach_sessions WHERE intervention_triggered = 1")
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(flagged.0, 1);
}

#[tokio::test]
async fn end_session_endpoint_is_idempotent() {
    let (app, _stub, pool) = test_app(StubMode::Reply("ok")).await;

    let user_id = Uuid::new_v4().to_string();
    let response = app
        .clone()
        .oneshot(chat_request(json!({
            "message": "hello there",
            "userId": user_id,
            "sessionId": "session-1",
        })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let session_id: (String,) = sqlx::query_as("SELECT id FROM coach_sessions")
        .fetch_one(&pool)
        .await
        .unwrap();

    let end_request = |rating: Value| {
        Request::builder()
            .method(Method::POST)
            .uri("/api/coach/session/end")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                json!({ "sessionId": session_id.0, "rating": rating }).to_string(),
            ))
            .unwrap()
    };

    let first = app.clone().oneshot(end_request(json!(5))).await.unwrap();
    assert_eq!(first.status(), StatusCode::NO_CONTENT);

    let second = app.oneshot(end_request(json!(2))).await.unwrap();
    assert_eq!(second.status(), StatusCode::CONFLICT);
}
