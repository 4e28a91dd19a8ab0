use crate::auth::{auth_middleware, verify_password, TokenKeys};
use crate::error::{Result, StarNeighboursError};
use crate::github::StarSource;
use crate::health::{liveness_check, readiness_check};
use crate::neighbours::{find_star_neighbours, StarNeighbours};
use crate::store::UserStore;
use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    middleware,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Form, Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub stars: Arc<dyn StarSource>,
    pub users: Arc<dyn UserStore>,
    pub tokens: TokenKeys,
    pub upstream_concurrency: usize,
}

/// Body of a failed upstream lookup
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub message: String,
}

/// Body of an authentication failure
#[derive(Debug, Serialize, Deserialize)]
pub struct DetailResponse {
    pub detail: String,
}

/// Login form
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
}

impl IntoResponse for StarNeighboursError {
    fn into_response(self) -> Response {
        match &self {
            StarNeighboursError::Unauthenticated | StarNeighboursError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                [(header::WWW_AUTHENTICATE, "Bearer")],
                Json(DetailResponse { detail: self.to_string() }),
            )
                .into_response(),
            e if e.is_upstream() => {
                warn!("Upstream lookup failed: {}", e);
                (StatusCode::BAD_REQUEST, Json(ErrorResponse { message: e.to_string() }))
                    .into_response()
            }
            e => {
                error!("Request failed: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse { message: e.to_string() }),
                )
                    .into_response()
            }
        }
    }
}

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/repos/:user/:repo/starneighbours", get(get_star_neighbours))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .route("/healthz", get(liveness_check))
        .route("/readyz", get(readiness_check))
        .route("/token", post(login_for_access_token))
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve the API until `shutdown` resolves
pub async fn start_server<F>(state: AppState, addr: SocketAddr, shutdown: F) -> Result<()>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("API listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app).with_graceful_shutdown(shutdown).await?;

    Ok(())
}

/// Repositories sharing stargazers with `user/repo`
async fn get_star_neighbours(
    State(state): State<AppState>,
    Path((user, repo)): Path<(String, String)>,
) -> Result<Json<StarNeighbours>> {
    let neighbours =
        find_star_neighbours(state.stars.as_ref(), &user, &repo, state.upstream_concurrency)
            .await?;
    Ok(Json(neighbours))
}

/// Exchange a username and password for a bearer token
async fn login_for_access_token(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> Result<Json<TokenResponse>> {
    let user = state
        .users
        .get_user(&form.username)
        .await?
        .filter(|user| !user.disabled)
        .ok_or(StarNeighboursError::InvalidCredentials)?;

    // bcrypt verification blocks
    let hashed_password = user.hashed_password.clone();
    let password = form.password;
    let matches = tokio::task::spawn_blocking(move || verify_password(&password, &hashed_password))
        .await
        .map_err(|e| StarNeighboursError::AuthError(format!("Password check failed: {}", e)))?;

    if !matches {
        warn!(username = %user.username, "Rejected login with a wrong password");
        return Err(StarNeighboursError::InvalidCredentials);
    }

    let access_token = state.tokens.issue(&user.username)?;
    info!(username = %user.username, "Issued access token");

    Ok(Json(TokenResponse {
        access_token,
        token_type: "bearer".to_string(),
    }))
}
