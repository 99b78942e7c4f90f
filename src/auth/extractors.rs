use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use crate::{error::AppError, state::AppState, users::repo_types::User};

/// Caller resolved from `Authorization: Bearer <token>` against the live
/// session list. Keeps the raw token so logout can revoke exactly it.
pub struct AuthUser {
    pub user: User,
    pub token: String,
}

/// An `AuthUser` whose record carries the admin flag.
pub struct AdminUser(pub User);

fn bearer_token(parts: &Parts) -> Option<&str> {
    let auth = parts
        .headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())?;
    auth.strip_prefix("Bearer ")
        .or_else(|| auth.strip_prefix("bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(AppError::Authentication)?.to_string();
        let user = state.tokens.authenticate(&token).await?;
        Ok(AuthUser { user, token })
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let AuthUser { user, .. } = AuthUser::from_request_parts(parts, state).await?;
        if !user.is_admin {
            tracing::warn!(id = %user.id, "admin route called by non-admin");
            return Err(AppError::Authorization);
        }
        Ok(AdminUser(user))
    }
}
