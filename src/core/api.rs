//! HTTP + WebSocket API for liveness sessions
//!
//! Endpoints:
//! - POST /session/new - Create new session
//! - POST /session/{id}/frame - Submit one frame
//! - GET /session/{id} - Get session status
//! - GET /session/{id}/result - Get scored result
//! - POST /session/{id}/close - Cancel session
//! - WS /ws/{id} - Live session events
//! - GET /health - Health check

use axum::{
    extract::{Path, State, WebSocketUpgrade, ws::{Message, WebSocket}},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, RwLock};

use crate::core::{CosineComparator, FaceComparator, LivenessSession, SessionEvent};
use crate::types::{
    Bearing, FaceAlignmentStatus, FaceRequirement, Frame, SessionError, SessionResult,
    SessionSettings, SessionState, StepOutput,
};

/// Server-side session
#[derive(Debug)]
pub struct Session {
    pub id: String,
    pub engine: LivenessSession,
    /// Score captures with cosine similarity of their templates
    pub compare_templates: bool,
    pub update_tx: broadcast::Sender<SessionEvent>,
    /// Wall-clock start; the deadline runs from here
    pub created_at: Instant,
    pub finished_at: Option<Instant>,
}

/// App state
pub struct AppState {
    pub sessions: RwLock<HashMap<String, Session>>,
    pub defaults: SessionSettings,
    /// How long finished sessions stay readable before eviction
    pub retention: Duration,
}

impl AppState {
    pub fn new(defaults: SessionSettings, retention: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            defaults,
            retention,
        }
    }

    /// Expire overdue sessions and evict finished ones past retention
    pub async fn sweep(&self) {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.values_mut().for_each(refresh);
        sessions.retain(|_, s| s.finished_at.map_or(true, |t| t.elapsed() < self.retention));
        let evicted = before - sessions.len();
        if evicted > 0 {
            tracing::debug!(evicted, remaining = sessions.len(), "finished sessions evicted");
        }
    }
}

/// Create new session request
#[derive(Debug, Default, Deserialize)]
pub struct NewSessionRequest {
    /// Replaces the server defaults entirely
    pub settings: Option<SessionSettings>,
    #[serde(default)]
    pub compare_templates: bool,
}

/// Create new session response
#[derive(Debug, Serialize)]
pub struct NewSessionResponse {
    pub session_id: String,
    pub websocket_url: String,
    pub requirement: FaceRequirement,
}

/// Session status response
#[derive(Debug, Serialize)]
pub struct SessionStatusResponse {
    pub session_id: String,
    pub state: SessionState,
    pub alignment: Option<FaceAlignmentStatus>,
    pub bearing: Bearing,
    pub step: usize,
    pub capture_count: usize,
    pub requirement: Option<FaceRequirement>,
    pub error: Option<SessionError>,
}

/// Result response
#[derive(Debug, Serialize)]
pub struct ResultResponse {
    pub session_id: String,
    pub passed: bool,
    pub result: Option<SessionResult>,
    pub error: Option<SessionError>,
}

/// Close response
#[derive(Debug, Serialize)]
pub struct CloseResponse {
    pub session_id: String,
    pub closed: bool,
    pub state: SessionState,
}

/// Error body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub sessions_active: usize,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (status, Json(ErrorResponse { error: message.into() }))
}

fn not_found(id: &str) -> ApiError {
    api_error(StatusCode::NOT_FOUND, format!("unknown session {}", id))
}

/// Create the API router
pub fn create_router(defaults: SessionSettings) -> Router {
    create_router_with_retention(defaults, Duration::from_secs(crate::SESSION_RETENTION_SECS))
}

/// Create the API router, keeping finished sessions for `retention`
pub fn create_router_with_retention(defaults: SessionSettings, retention: Duration) -> Router {
    router(Arc::new(AppState::new(defaults, retention)))
}

fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/session/new", post(create_session))
        .route("/session/:id", get(get_session))
        .route("/session/:id/frame", post(submit_frame))
        .route("/session/:id/result", get(get_result))
        .route("/session/:id/close", post(close_session))
        .route("/ws/:id", get(websocket_handler))
        .with_state(state)
}

/// Health check endpoint
async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    state.sweep().await;
    let sessions = state.sessions.read().await;
    let active = sessions.values().filter(|s| !s.engine.is_finished()).count();
    Json(HealthResponse {
        status: "ok".to_string(),
        version: crate::VERSION.to_string(),
        sessions_active: active,
    })
}

/// Create new session
async fn create_session(
    State(state): State<Arc<AppState>>,
    body: Option<Json<NewSessionRequest>>,
) -> Result<Json<NewSessionResponse>, ApiError> {
    state.sweep().await;
    let req = body.map(|Json(req)| req).unwrap_or_default();
    let settings = req.settings.unwrap_or_else(|| state.defaults.clone());
    let mut engine = LivenessSession::new(settings)
        .map_err(|e| api_error(StatusCode::UNPROCESSABLE_ENTITY, e.to_string()))?;

    let session_id = generate_session_id();
    let (tx, _) = broadcast::channel(100);
    let requirement_tx = tx.clone();
    engine.register_requirement_listener(move |requirement| {
        let _ = requirement_tx.send(SessionEvent::Requirement(requirement.clone()));
    });
    let requirement = engine.current_requirement();

    let session = Session {
        id: session_id.clone(),
        engine,
        compare_templates: req.compare_templates,
        update_tx: tx,
        created_at: Instant::now(),
        finished_at: None,
    };

    let mut sessions = state.sessions.write().await;
    sessions.insert(session_id.clone(), session);
    tracing::info!(session = %session_id, "session created");

    Ok(Json(NewSessionResponse {
        session_id: session_id.clone(),
        websocket_url: format!("/ws/{}", session_id),
        requirement,
    }))
}

/// Get session status
async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<SessionStatusResponse>, ApiError> {
    let mut sessions = state.sessions.write().await;
    let session = sessions.get_mut(&id).ok_or_else(|| not_found(&id))?;
    refresh(session);
    let engine = &session.engine;

    Ok(Json(SessionStatusResponse {
        session_id: id,
        state: engine.state(),
        alignment: engine.state().alignment_status(),
        bearing: engine.bearing(),
        step: engine.step(),
        capture_count: engine.captures().len(),
        requirement: (!engine.is_finished()).then(|| engine.current_requirement()),
        error: engine.failure().cloned(),
    }))
}

/// Submit one frame to a session
async fn submit_frame(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(frame): Json<Frame>,
) -> Result<Json<StepOutput>, ApiError> {
    let mut sessions = state.sessions.write().await;
    let session = sessions.get_mut(&id).ok_or_else(|| not_found(&id))?;
    refresh(session);
    let was_finished = session.engine.is_finished();

    let output = session.engine.process(frame);
    if output.captured {
        if let Some(capture) = session.engine.captures().last() {
            let _ = session.update_tx.send(SessionEvent::Captured(capture.clone()));
        }
    }
    let _ = session.update_tx.send(SessionEvent::Progress(output.clone()));
    if !was_finished && session.engine.is_finished() {
        let _ = session.update_tx.send(terminal_event(session));
    }
    refresh(session);

    Ok(Json(output))
}

/// Get the scored result of a finished session
async fn get_result(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ResultResponse>, ApiError> {
    let mut sessions = state.sessions.write().await;
    let session = sessions.get_mut(&id).ok_or_else(|| not_found(&id))?;
    refresh(session);
    let outcome = outcome(session)
        .ok_or_else(|| api_error(StatusCode::CONFLICT, "session still running"))?;

    Ok(Json(match outcome {
        Ok(result) => ResultResponse {
            session_id: id,
            passed: result.passed(),
            result: Some(result),
            error: None,
        },
        Err(err) => ResultResponse {
            session_id: id,
            passed: false,
            result: None,
            error: Some(err),
        },
    }))
}

/// Cancel a session
async fn close_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<CloseResponse>, ApiError> {
    let mut sessions = state.sessions.write().await;
    let session = sessions.get_mut(&id).ok_or_else(|| not_found(&id))?;
    refresh(session);
    let was_finished = session.engine.is_finished();

    let closed = session.engine.close();
    if closed && !was_finished {
        let _ = session.update_tx.send(terminal_event(session));
    }
    refresh(session);
    tracing::info!(session = %id, closed, "session close requested");

    Ok(Json(CloseResponse {
        session_id: id,
        closed,
        state: session.engine.state(),
    }))
}

/// Enforce the wall-clock deadline and stamp when the session ended
///
/// Frame timestamps come from the client; this clock does not.
fn refresh(session: &mut Session) {
    if !session.engine.is_finished() {
        let elapsed = session.created_at.elapsed();
        if elapsed >= Duration::from_millis(session.engine.settings().timeout_ms) {
            let output = session.engine.expire(elapsed.as_millis() as u64);
            let _ = session.update_tx.send(SessionEvent::Progress(output));
            let _ = session.update_tx.send(terminal_event(session));
            tracing::info!(session = %session.id, elapsed_ms = elapsed.as_millis() as u64, "session expired");
        }
    }
    if session.engine.is_finished() && session.finished_at.is_none() {
        session.finished_at = Some(Instant::now());
    }
}

fn outcome(session: &Session) -> Option<Result<SessionResult, SessionError>> {
    let comparator = session.compare_templates.then_some(&CosineComparator as &dyn FaceComparator);
    session.engine.finish(comparator)
}

fn terminal_event(session: &Session) -> SessionEvent {
    match outcome(session) {
        Some(Ok(result)) => SessionEvent::Completed(result),
        Some(Err(err)) => SessionEvent::Failed(err),
        None => SessionEvent::Failed(SessionError::Cancelled),
    }
}

/// WebSocket handler for live updates
async fn websocket_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ws: WebSocketUpgrade,
) -> Result<impl IntoResponse, ApiError> {
    let sessions = state.sessions.read().await;
    let session = sessions.get(&id).ok_or_else(|| not_found(&id))?;
    let rx = session.update_tx.subscribe();
    drop(sessions);

    Ok(ws.on_upgrade(move |socket| async move {
        handle_websocket(socket, rx).await;
    }))
}

/// Forward session events until either side goes away
async fn handle_websocket(socket: WebSocket, mut rx: broadcast::Receiver<SessionEvent>) {
    let (mut sender, mut receiver) = socket.split();

    let mut forward = tokio::spawn(async move {
        loop {
            let event = match rx.recv().await {
                Ok(event) => event,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "websocket client lagging");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            };
            let terminal = event.is_terminal();
            let json = match serde_json::to_string(&event) {
                Ok(json) => json,
                Err(e) => {
                    tracing::warn!(error = %e, "failed to encode session event");
                    continue;
                }
            };
            if sender.send(Message::Text(json)).await.is_err() || terminal {
                break;
            }
        }
        let _ = sender.close().await;
    });

    let mut drain = tokio::spawn(async move {
        while let Some(Ok(message)) = receiver.next().await {
            if matches!(message, Message::Close(_)) {
                break;
            }
        }
    });

    tokio::select! {
        _ = &mut forward => drain.abort(),
        _ = &mut drain => forward.abort(),
    }
}

/// Generate session ID
fn generate_session_id() -> String {
    format!("session_{:016x}", rand::random::<u64>())
}

/// Run the API server
pub async fn run_server(addr: &str, defaults: SessionSettings) -> Result<(), Box<dyn std::error::Error>> {
    let state = Arc::new(AppState::new(
        defaults,
        Duration::from_secs(crate::SESSION_RETENTION_SECS),
    ));
    let sweeper = state.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(crate::SESSION_SWEEP_INTERVAL_SECS));
        loop {
            interval.tick().await;
            sweeper.sweep().await;
        }
    });

    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "poselock API listening");
    tracing::info!("  POST /session/new        - Create session");
    tracing::info!("  POST /session/:id/frame  - Submit frame");
    tracing::info!("  GET  /session/:id        - Get status");
    tracing::info!("  GET  /session/:id/result - Get result");
    tracing::info!("  POST /session/:id/close  - Cancel session");
    tracing::info!("  WS   /ws/:id             - Live events");
    tracing::info!("  GET  /health             - Health check");
    axum::serve(listener, app).await?;
    Ok(())
}
