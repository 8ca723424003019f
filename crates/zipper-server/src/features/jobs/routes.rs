//! Job routes
//!
//! - `POST /` - validate and enqueue a job, `202 {"id": ...}`
//! - `GET /health` - liveness and queue limits

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

use super::commands::{submit, SubmitJobCommand};
use super::queries::health;
use crate::error::AppError;
use crate::features::FeatureState;

pub fn jobs_routes() -> Router<FeatureState> {
    Router::new()
        .route("/", post(submit_job))
        .route("/health", get(health_check))
}

/// Enqueue a job
///
/// POST /
async fn submit_job(State(state): State<FeatureState>, body: String) -> Result<Response, AppError> {
    let command = SubmitJobCommand::new(body);
    let response = submit::handle(state.queue.as_ref(), &state.limits, command).await?;
    Ok((StatusCode::ACCEPTED, Json(response)).into_response())
}

/// GET /health
async fn health_check(State(state): State<FeatureState>) -> impl IntoResponse {
    Json(health::handle(&state.limits))
}
