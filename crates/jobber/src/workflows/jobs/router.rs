use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        Path, Query, State, WebSocketUpgrade,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use super::dispatch::DEFAULT_CLAIM_LIMIT;
use super::domain::{JobId, PostingDraft, TaskResult};
use super::events::NotificationBus;
use super::service::{JobWorkspace, WorkspaceError};

/// Router builder exposing the orchestration workflow over HTTP: posting
/// ingestion, per-job lifecycle actions, the executor pull protocol, and
/// the realtime event stream.
pub fn job_router(workspace: Arc<JobWorkspace>) -> Router {
    Router::new()
        .route("/api/jobs/discover", post(discover_handler))
        .route("/api/jobs/:job_id/score", post(score_handler))
        .route("/api/jobs/:job_id/draft", post(draft_handler))
        .route("/api/jobs/:job_id/queue-apply", post(queue_apply_handler))
        .route("/api/jobs/:job_id/approve", post(approve_handler))
        .route("/api/jobs/:job_id/reject", post(reject_handler))
        .route("/api/state", get(state_handler))
        .route("/api/runner/pending", get(pending_handler))
        .route("/api/runner/result", post(result_handler))
        .route("/api/runner/sweep", post(sweep_handler))
        .route("/ws", get(ws_handler))
        .with_state(workspace)
}

#[derive(Debug, Deserialize)]
pub(crate) struct DiscoverRequest {
    pub(crate) jobs: Vec<PostingDraft>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PendingQuery {
    pub(crate) limit: Option<usize>,
}

fn workspace_error(err: WorkspaceError) -> Response {
    let status = match err {
        WorkspaceError::UnknownJob(_) => StatusCode::NOT_FOUND,
    };
    (status, Json(json!({ "error": err.to_string() }))).into_response()
}

pub(crate) async fn discover_handler(
    State(workspace): State<Arc<JobWorkspace>>,
    Json(payload): Json<DiscoverRequest>,
) -> Response {
    if payload.jobs.is_empty() {
        let body = json!({ "error": "at least one posting is required" });
        return (StatusCode::UNPROCESSABLE_ENTITY, Json(body)).into_response();
    }

    let jobs = workspace.discover(payload.jobs);
    (StatusCode::CREATED, Json(json!({ "jobs": jobs }))).into_response()
}

pub(crate) async fn score_handler(
    State(workspace): State<Arc<JobWorkspace>>,
    Path(job_id): Path<String>,
) -> Response {
    match workspace.score(&JobId(job_id)).await {
        Ok(scored) => Json(json!({ "scored": scored })).into_response(),
        Err(err) => workspace_error(err),
    }
}

pub(crate) async fn draft_handler(
    State(workspace): State<Arc<JobWorkspace>>,
    Path(job_id): Path<String>,
) -> Response {
    match workspace.draft(&JobId(job_id)).await {
        Ok(draft) => Json(json!({ "draft": draft })).into_response(),
        Err(err) => workspace_error(err),
    }
}

pub(crate) async fn queue_apply_handler(
    State(workspace): State<Arc<JobWorkspace>>,
    Path(job_id): Path<String>,
) -> Response {
    match workspace.queue_apply(&JobId(job_id)).await {
        Ok(outcome) => Json(json!({ "result": outcome })).into_response(),
        Err(err) => workspace_error(err),
    }
}

pub(crate) async fn approve_handler(
    State(workspace): State<Arc<JobWorkspace>>,
    Path(job_id): Path<String>,
) -> Response {
    match workspace.approve(&JobId(job_id)).await {
        Ok(application) => Json(json!({ "application": application })).into_response(),
        Err(err) => workspace_error(err),
    }
}

pub(crate) async fn reject_handler(
    State(workspace): State<Arc<JobWorkspace>>,
    Path(job_id): Path<String>,
) -> Response {
    match workspace.reject(&JobId(job_id)).await {
        Ok(application) => Json(json!({ "application": application })).into_response(),
        Err(err) => workspace_error(err),
    }
}

pub(crate) async fn state_handler(State(workspace): State<Arc<JobWorkspace>>) -> Response {
    Json(workspace.snapshot()).into_response()
}

pub(crate) async fn pending_handler(
    State(workspace): State<Arc<JobWorkspace>>,
    Query(query): Query<PendingQuery>,
) -> Response {
    let limit = query.limit.unwrap_or(DEFAULT_CLAIM_LIMIT);
    let tasks = workspace.claim_tasks(limit);
    Json(json!({ "tasks": tasks })).into_response()
}

pub(crate) async fn result_handler(
    State(workspace): State<Arc<JobWorkspace>>,
    Json(result): Json<TaskResult>,
) -> Response {
    match workspace.handle_executor_result(result).await {
        Ok(receipt) => Json(receipt).into_response(),
        Err(err) => workspace_error(err),
    }
}

pub(crate) async fn sweep_handler(State(workspace): State<Arc<JobWorkspace>>) -> Response {
    match workspace.sweep_leases().await {
        Ok(expired) => Json(json!({ "expired": expired })).into_response(),
        Err(err) => workspace_error(err),
    }
}

pub(crate) async fn ws_handler(
    State(workspace): State<Arc<JobWorkspace>>,
    upgrade: WebSocketUpgrade,
) -> Response {
    let events = workspace.events();
    upgrade.on_upgrade(move |socket| stream_events(socket, events))
}

/// Forward published event frames to one websocket client until either
/// side goes away.
async fn stream_events(mut socket: WebSocket, events: Arc<NotificationBus>) {
    let mut subscription = events.subscribe();

    loop {
        tokio::select! {
            frame = subscription.receiver.recv() => {
                let Some(frame) = frame else { break };
                if socket.send(Message::Text(frame)).await.is_err() {
                    break;
                }
            }
            incoming = socket.recv() => {
                match incoming {
                    // Client frames carry nothing we act on.
                    Some(Ok(_)) => {}
                    _ => break,
                }
            }
        }
    }

    events.unsubscribe(subscription.id);
}
