//! Health check endpoints

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use super::{route_error, RouteError};
use crate::state::AppState;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthCheckResponse {
    pub status_code: u16,
    pub detail: String,
    pub result: String,
}

impl HealthCheckResponse {
    fn working() -> Self {
        Self {
            status_code: StatusCode::OK.as_u16(),
            detail: "ok".to_string(),
            result: "working".to_string(),
        }
    }
}

/// GET /healthcheck - The service is up
async fn health_check(State(state): State<AppState>) -> Json<HealthCheckResponse> {
    info!(
        "Health check endpoint '/' called (version {})",
        state.settings().app_version
    );
    Json(HealthCheckResponse::working())
}

/// GET /healthcheck/db - The database answers queries
async fn database_health_check(
    State(state): State<AppState>,
) -> Result<Json<HealthCheckResponse>, RouteError> {
    info!("Health check endpoint '/db' called");
    if state.database().ping().await {
        info!("Database is working");
        return Ok(Json(HealthCheckResponse::working()));
    }

    error!("Database unavailable");
    Err(route_error(
        StatusCode::SERVICE_UNAVAILABLE,
        "Database unavailable",
    ))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/healthcheck", get(health_check))
        .route("/healthcheck/", get(health_check))
        .route("/healthcheck/db", get(database_health_check))
}
