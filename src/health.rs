use crate::api::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use tracing::error;

pub const HEALTH_MESSAGE: &str = "The api is running";

/// Readiness check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Liveness check - answers while the process is up
pub async fn liveness_check() -> Json<&'static str> {
    Json(HEALTH_MESSAGE)
}

/// Readiness check - ready once the user store answers
pub async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    match state.users.ping().await {
        Ok(()) => (StatusCode::OK, Json(ReadinessResponse { ready: true, message: None })),
        Err(e) => {
            error!("Readiness check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ReadinessResponse {
                    ready: false,
                    message: Some(format!("Not ready - user store: {}", e)),
                }),
            )
        }
    }
}
