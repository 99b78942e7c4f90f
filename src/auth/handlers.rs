use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use tracing::{info, instrument};

use crate::{
    auth::{
        dto::{LoginRequest, LoginResponse, LogoutResponse},
        extractors::AuthUser,
    },
    error::AppError,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, AppError> {
    let Json(payload) = payload?;
    let user = state
        .users
        .find_by_credentials(&payload.email, &payload.password)
        .await?;
    let token = state.tokens.issue(user.id).await?;

    info!(id = %user.id, user_id = %user.user_id, "user logged in");
    Ok(Json(LoginResponse {
        status: true,
        message: "User login successfully",
        token,
        user: user.into(),
    }))
}

#[instrument(skip(state, caller))]
pub async fn logout(
    State(state): State<AppState>,
    caller: AuthUser,
) -> Result<Json<LogoutResponse>, AppError> {
    state.tokens.revoke(caller.user.id, &caller.token).await?;
    info!(id = %caller.user.id, "user logged out");
    Ok(Json(LogoutResponse {
        status: true,
        message: "Logout successful",
    }))
}
