//! Health and status handlers

use crate::api::rest::state::AppState;
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthCheckResponse {
    pub status: String,
    pub version: String,
    pub uptime: String,
    pub model: String,
    /// An evaluation currently holds the solver
    pub busy: bool,
    pub evaluations_completed: u64,
    pub evaluations_failed: u64,
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthCheckResponse> {
    Json(HealthCheckResponse {
        status: "healthy".to_string(),
        version: state.version.clone(),
        uptime: state.uptime(),
        model: state.model_name.clone(),
        busy: state.engine.is_busy(),
        evaluations_completed: state.engine.evaluations_completed(),
        evaluations_failed: state.engine.evaluations_failed(),
    })
}
