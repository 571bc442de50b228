//! In-process fake of the backend REST API.

#![allow(dead_code)]

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::{collections::VecDeque, sync::Arc, time::Duration};

pub const PASSWORD: &str = "correct-horse";

#[derive(Default)]
pub struct Inner {
    pub access_token: String,
    pub refresh_token: String,
    pub generation: u32,
    pub refresh_calls: u32,
    pub refresh_delay: Duration,
    pub refresh_fails: bool,
    pub create_attempts: u32,
    pub created: u32,
    pub last_upload: Vec<u8>,
    pub fetch_calls: u32,
    pub scan_replies: VecDeque<Value>,
}

#[derive(Clone, Default)]
pub struct FakeBackend {
    pub inner: Arc<Mutex<Inner>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        let backend = Self::default();
        {
            let mut inner = backend.inner.lock();
            inner.access_token = "access-0".to_string();
            inner.refresh_token = "refresh-0".to_string();
        }
        backend
    }

    pub fn with_scan_replies(self, replies: Vec<Value>) -> Self {
        self.inner.lock().scan_replies = replies.into();
        self
    }

    pub fn refresh_calls(&self) -> u32 {
        self.inner.lock().refresh_calls
    }

    /// Bind on an ephemeral port and return the API base URL.
    pub async fn spawn(&self) -> String {
        let app = Router::new()
            .route("/api/v1/auth/login", post(login))
            .route("/api/v1/auth/refresh", post(refresh))
            .route("/api/v1/me", get(me))
            .route("/api/v1/scan", post(create_scan))
            .route("/api/v1/scan/{id}", get(fetch_scan))
            .route("/api/v1/scan/{id}/corrections", get(corrections))
            .layer(DefaultBodyLimit::max(16 * 1024 * 1024))
            .with_state(self.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}/api/v1")
    }
}

pub fn scan_json(status: &str) -> Value {
    json!({
        "id": "s1",
        "user_id": "u1",
        "status": status,
        "created_at": "2024-05-01T10:00:00Z"
    })
}

pub fn completed_json(score: &str) -> Value {
    json!({
        "id": "s1",
        "user_id": "u1",
        "status": "completed",
        "nutri_score": score,
        "nutri_score_value": 2.0,
        "nutrients": { "energy_kcal": 120.0, "sugars": 4.5 },
        "highlights": [
            { "name": "Sugars", "value": 4.5, "unit": "g", "level": "low", "message": "Low sugar" }
        ],
        "insights": [
            { "type": "positive", "title": "Good choice", "message": "Low in sugar" }
        ],
        "processing_time_ms": 2300,
        "created_at": "2024-05-01T10:00:00Z"
    })
}

fn user_json() -> Value {
    json!({
        "id": "u1",
        "email": "ana@example.com",
        "name": "Ana",
        "role": "user",
        "created_at": "2024-01-01T00:00:00Z"
    })
}

fn ok(data: Value) -> Response {
    Json(json!({ "success": true, "data": data })).into_response()
}

fn fail(status: StatusCode, error: &str) -> Response {
    (status, Json(json!({ "success": false, "error": error }))).into_response()
}

fn authorized(state: &FakeBackend, headers: &HeaderMap) -> bool {
    let expected = format!("Bearer {}", state.inner.lock().access_token);
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        == Some(expected.as_str())
}

async fn login(State(state): State<FakeBackend>, Json(body): Json<Value>) -> Response {
    if body["password"] != PASSWORD {
        return fail(StatusCode::UNAUTHORIZED, "Invalid credentials");
    }
    let inner = state.inner.lock();
    ok(json!({
        "user": user_json(),
        "access_token": inner.access_token,
        "refresh_token": inner.refresh_token,
        "expires_at": "2030-01-01T00:00:00Z"
    }))
}

async fn refresh(State(state): State<FakeBackend>, Json(body): Json<Value>) -> Response {
    let delay = state.inner.lock().refresh_delay;
    tokio::time::sleep(delay).await;

    let mut inner = state.inner.lock();
    inner.refresh_calls += 1;
    if inner.refresh_fails || body["refresh_token"] != inner.refresh_token.as_str() {
        return fail(StatusCode::UNAUTHORIZED, "Invalid refresh token");
    }
    inner.generation += 1;
    inner.access_token = format!("access-{}", inner.generation);
    inner.refresh_token = format!("refresh-{}", inner.generation);
    ok(json!({
        "access_token": inner.access_token,
        "refresh_token": inner.refresh_token,
        "expires_at": "2030-01-01T00:00:00Z"
    }))
}

async fn me(State(state): State<FakeBackend>, headers: HeaderMap) -> Response {
    if !authorized(&state, &headers) {
        return fail(StatusCode::UNAUTHORIZED, "Unauthorized");
    }
    ok(user_json())
}

async fn create_scan(State(state): State<FakeBackend>, headers: HeaderMap, body: Bytes) -> Response {
    state.inner.lock().create_attempts += 1;
    if !authorized(&state, &headers) {
        return fail(StatusCode::UNAUTHORIZED, "Unauthorized");
    }
    let is_multipart = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("multipart/form-data"));
    if !is_multipart {
        return fail(StatusCode::BAD_REQUEST, "Expected multipart body");
    }

    let mut inner = state.inner.lock();
    inner.created += 1;
    inner.last_upload = body.to_vec();
    (StatusCode::CREATED, Json(json!({ "success": true, "data": scan_json("processing") })))
        .into_response()
}

async fn fetch_scan(
    State(state): State<FakeBackend>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    if !authorized(&state, &headers) {
        return fail(StatusCode::UNAUTHORIZED, "Unauthorized");
    }
    let mut inner = state.inner.lock();
    inner.fetch_calls += 1;
    match inner.scan_replies.pop_front() {
        Some(reply) => ok(reply),
        None => fail(StatusCode::NOT_FOUND, &format!("Scan {id} not found")),
    }
}

async fn corrections(State(state): State<FakeBackend>, headers: HeaderMap) -> Response {
    if !authorized(&state, &headers) {
        return fail(StatusCode::UNAUTHORIZED, "Unauthorized");
    }
    Json(json!({ "success": true })).into_response()
}

/// Write a file that sniffs as JPEG
pub fn jpeg_file(dir: &std::path::Path, name: &str, size: usize) -> std::path::PathBuf {
    let mut bytes = vec![0u8; size];
    bytes[..4].copy_from_slice(&[0xFF, 0xD8, 0xFF, 0xE0]);
    let path = dir.join(name);
    std::fs::write(&path, bytes).unwrap();
    path
}
