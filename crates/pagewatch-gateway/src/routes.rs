//! HTTP route handlers.

use std::collections::HashMap;
use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use serde::Deserialize;

use pagewatch_core::types::WatchTask;
use pagewatch_scheduler::runner;

use super::server::AppState;

/// GET /api/v1/info
pub async fn system_info(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "ok": true,
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_secs": state.start_time.elapsed().as_secs(),
        "scheduler_enabled": state.scheduler_enabled,
        "active_watches": state.scheduler.active_count(),
        "socket_clients": state.hub.client_count(),
    }))
}

/// POST /api/v1/executions — run a single fetch/extract cycle for a
/// task-shaped payload and return the raw result. Deliberately bypasses
/// the notification policy and the fan-out.
pub async fn execute_once(
    State(state): State<Arc<AppState>>,
    Json(task): Json<WatchTask>,
) -> Json<serde_json::Value> {
    let result = runner::run(state.fetcher.as_ref(), &task).await;
    Json(serde_json::json!({ "ok": true, "result": result }))
}

/// GET /api/v1/executions?url=… — query-parameter variant of the
/// one-off execution.
pub async fn execute_once_query(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<serde_json::Value> {
    let Some(url) = params.get("url").filter(|u| !u.is_empty()) else {
        return Json(serde_json::json!({ "ok": false, "error": "missing url parameter" }));
    };
    let task = WatchTask::new(url.clone());
    let result = runner::run(state.fetcher.as_ref(), &task).await;
    Json(serde_json::json!({ "ok": true, "result": result }))
}

/// GET /api/v1/tasks
pub async fn list_tasks(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    match state.store.list() {
        Ok(tasks) => Json(serde_json::json!({ "ok": true, "tasks": tasks })),
        Err(e) => Json(serde_json::json!({ "ok": false, "error": e.to_string() })),
    }
}

/// POST /api/v1/tasks — create a task and, when the scheduler is
/// running, register its timer.
pub async fn create_task(
    State(state): State<Arc<AppState>>,
    Json(mut task): Json<WatchTask>,
) -> Json<serde_json::Value> {
    if task.url.is_empty() {
        return Json(serde_json::json!({ "ok": false, "error": "url is required" }));
    }

    match state.store.insert(&task) {
        Ok(id) => {
            task.id = id;
            let scheduled = state.scheduler_enabled && state.scheduler.schedule(task.clone());
            Json(serde_json::json!({ "ok": true, "task": task, "scheduled": scheduled }))
        }
        Err(e) => Json(serde_json::json!({ "ok": false, "error": e.to_string() })),
    }
}

/// DELETE /api/v1/tasks/{id} — remove the task and its timer. The
/// timer goes first so a tick cannot resurrect state mid-delete.
pub async fn delete_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Json<serde_json::Value> {
    let cancelled = state.scheduler.cancel(id);
    match state.store.delete(id) {
        Ok(deleted) => {
            if deleted {
                tracing::info!("task {id} deleted (timer cancelled: {cancelled})");
            }
            Json(serde_json::json!({ "ok": deleted, "cancelled": cancelled }))
        }
        Err(e) => Json(serde_json::json!({ "ok": false, "error": e.to_string() })),
    }
}

#[derive(Deserialize)]
pub struct ReschedulePayload {
    pub cadence_minutes: u32,
}

/// POST /api/v1/tasks/{id}/reschedule
pub async fn reschedule_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(payload): Json<ReschedulePayload>,
) -> Json<serde_json::Value> {
    match state.scheduler.reschedule(id, payload.cadence_minutes) {
        Ok(true) => Json(serde_json::json!({ "ok": true })),
        Ok(false) => Json(serde_json::json!({ "ok": false, "error": "no such task" })),
        Err(e) => Json(serde_json::json!({ "ok": false, "error": e.to_string() })),
    }
}
