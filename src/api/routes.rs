//! API routes

use std::collections::BTreeMap;
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
};
use serde::Deserialize;

use super::error::ApiError;
use crate::heartbeat::{HeartbeatScheduler, ScheduledProcess};
use crate::supervisor::Supervisor;

/// Application state shared across routes
#[derive(Clone)]
pub struct AppState {
    /// Supervision core handle.
    pub supervisor: Supervisor,
    /// Heartbeat job handle.
    pub heartbeat: HeartbeatScheduler,
    /// Deadline applied to delete-process requests.
    pub kill_timeout: Duration,
}

/// Request body naming one process identifier.
#[derive(Debug, Deserialize)]
pub struct CreateProcessRequest {
    /// Caller-supplied process identifier.
    pub process_id: u32,
}

/// Create all API routes
pub fn create_routes(state: AppState) -> Router {
    Router::new()
        // Supervised processes
        .route("/ipc/create-process", post(create_process))
        .route("/ipc/delete-process/{id}", delete(delete_process))
        .route("/ipc/get-single/{id}", get(get_single))
        .route("/ipc/get-all", get(get_all))
        // Heartbeat job
        .route("/process/create-process", post(create_heartbeat))
        .route("/process/delete-process/{id}", delete(delete_heartbeat))
        .route("/process/get-single/{id}", get(get_heartbeat_lines))
        .route("/process/get-all", get(get_all_heartbeats))
        .with_state(state)
}

/// Spawn and register a new supervised process
async fn create_process(
    State(state): State<AppState>,
    Json(req): Json<CreateProcessRequest>,
) -> Result<(StatusCode, String), ApiError> {
    state.supervisor.start(req.process_id).await?;
    Ok((
        StatusCode::CREATED,
        format!("Process started successfully with ID: {}", req.process_id),
    ))
}

/// Kill a supervised process and drop its captured output
async fn delete_process(
    State(state): State<AppState>,
    Path(id): Path<u32>,
) -> Result<(StatusCode, String), ApiError> {
    state.supervisor.kill(id, state.kill_timeout).await?;
    Ok((StatusCode::OK, String::from("Process killed successfully.")))
}

/// Captured output lines for one process
async fn get_single(
    State(state): State<AppState>,
    Path(id): Path<u32>,
) -> Result<Json<Vec<String>>, ApiError> {
    match state.supervisor.find_by_identifier(id).await {
        Some(lines) => Ok(Json(lines)),
        None => Err(ApiError::NotFound(format!(
            "no captured output for process {id}"
        ))),
    }
}

/// Identifier and start time of every live process
async fn get_all(State(state): State<AppState>) -> Json<BTreeMap<String, String>> {
    let map = state
        .supervisor
        .find_all()
        .await
        .into_iter()
        .map(|info| {
            (
                format!("Process Id : {}", info.process_id),
                format!("Start Time : {}", info.started_at.to_rfc3339()),
            )
        })
        .collect();
    Json(map)
}

/// Schedule the periodic heartbeat for one identifier
async fn create_heartbeat(
    State(state): State<AppState>,
    Json(req): Json<CreateProcessRequest>,
) -> Result<(StatusCode, String), ApiError> {
    state.heartbeat.schedule(req.process_id).await?;
    Ok((
        StatusCode::CREATED,
        format!("Heartbeat scheduled for process {}", req.process_id),
    ))
}

/// Stop the heartbeat for one identifier
async fn delete_heartbeat(
    State(state): State<AppState>,
    Path(id): Path<u32>,
) -> Result<(StatusCode, String), ApiError> {
    state.heartbeat.stop(id).await?;
    Ok((StatusCode::OK, format!("Heartbeat for process {id} deleted.")))
}

/// Accumulated heartbeat messages for one identifier
async fn get_heartbeat_lines(
    State(state): State<AppState>,
    Path(id): Path<u32>,
) -> Result<Json<Vec<String>>, ApiError> {
    match state.heartbeat.lines(id).await {
        Some(lines) => Ok(Json(lines)),
        None => Err(ApiError::NotFound(format!(
            "no heartbeat messages for process {id}"
        ))),
    }
}

/// Every scheduled heartbeat
async fn get_all_heartbeats(State(state): State<AppState>) -> Json<Vec<ScheduledProcess>> {
    Json(state.heartbeat.list().await)
}
