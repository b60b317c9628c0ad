//! HTTP route handlers for the UI API.

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::{get, post};
use flowloop::core::flow::{FlowChart, fixed_flow};
use flowloop::core::invariants::validate_config;
use flowloop::core::registry::{self, Operation};
use flowloop::core::types::{RunConfig, RunId, StateEvent};
use serde::Serialize;
use tracing::info;

use crate::state::AppState;

/// Build the API router.
pub fn api_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/operations", get(list_operations))
        .route("/flow", get(get_flow))
        .route("/runs", post(start_run))
        .route("/runs/current", get(current_run).delete(cancel_run))
}

async fn health() -> &'static str {
    "ok"
}

/// GET /api/operations - the operation catalog in stable order.
async fn list_operations() -> Json<&'static [Operation]> {
    Json(registry::operations())
}

/// GET /api/flow - node and edge topology for the flow chart.
async fn get_flow() -> Json<FlowChart> {
    Json(fixed_flow())
}

#[derive(Serialize)]
struct RunStarted {
    run_id: RunId,
}

#[derive(Serialize)]
struct ApiError {
    errors: Vec<String>,
}

fn unprocessable(errors: Vec<String>) -> (StatusCode, Json<ApiError>) {
    (StatusCode::UNPROCESSABLE_ENTITY, Json(ApiError { errors }))
}

/// POST /api/runs - start a run, cancelling any active one.
async fn start_run(
    State(state): State<AppState>,
    Json(config): Json<RunConfig>,
) -> Result<(StatusCode, Json<RunStarted>), (StatusCode, Json<ApiError>)> {
    let errors = validate_config(&config);
    if !errors.is_empty() {
        return Err(unprocessable(errors));
    }
    let run_id = state
        .controller
        .start_run(config)
        .map_err(|err| unprocessable(vec![err.to_string()]))?;
    info!(%run_id, "run requested");
    Ok((StatusCode::ACCEPTED, Json(RunStarted { run_id })))
}

/// DELETE /api/runs/current - cancel the active run (no-op when idle).
async fn cancel_run(State(state): State<AppState>) -> StatusCode {
    state.controller.cancel_run();
    StatusCode::NO_CONTENT
}

/// GET /api/runs/current - last published state event.
async fn current_run(State(state): State<AppState>) -> Result<Json<StateEvent>, StatusCode> {
    state
        .controller
        .snapshot()
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}
