use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use super::jwt::JwtKeys;
use crate::{error::AppError, users::repo::UserRepo, users::repo_types::User};

/// Issues bearer tokens and keeps the per-user list of live sessions. A token
/// is only accepted while its session entry exists, so revocation takes effect
/// immediately even though the signature stays valid until expiry.
#[derive(Clone)]
pub struct TokenAuthority {
    keys: JwtKeys,
    repo: Arc<dyn UserRepo>,
}

impl TokenAuthority {
    pub fn new(keys: JwtKeys, repo: Arc<dyn UserRepo>) -> Self {
        Self { keys, repo }
    }

    pub async fn issue(&self, user_id: Uuid) -> Result<String, AppError> {
        let jti = Uuid::new_v4();
        let token = self.keys.sign(user_id, jti)?;
        if !self.repo.add_session(user_id, jti).await? {
            return Err(AppError::NotFound(format!("user {user_id}")));
        }
        info!(%user_id, %jti, "session issued");
        Ok(token)
    }

    /// Resolves a bearer token to the current user record.
    pub async fn authenticate(&self, token: &str) -> Result<User, AppError> {
        let claims = self.keys.verify(token).map_err(|e| {
            warn!(error = %e, "invalid or expired token");
            AppError::Authentication
        })?;
        let Some(user) = self.repo.find_by_id(claims.sub).await? else {
            warn!(user_id = %claims.sub, "token for missing user");
            return Err(AppError::Authentication);
        };
        if !self.repo.has_session(user.id, claims.jti).await? {
            warn!(user_id = %user.id, jti = %claims.jti, "token not in active sessions");
            return Err(AppError::Authentication);
        }
        Ok(user)
    }

    /// Drops the session entry behind `token`. Unknown, foreign or already
    /// revoked tokens are a no-op.
    pub async fn revoke(&self, user_id: Uuid, token: &str) -> Result<(), AppError> {
        let claims = match self.keys.verify_ignoring_expiry(token) {
            Ok(c) => c,
            Err(e) => {
                debug!(error = %e, "revoke of unverifiable token ignored");
                return Ok(());
            }
        };
        if claims.sub != user_id {
            debug!(%user_id, owner = %claims.sub, "revoke of foreign token ignored");
            return Ok(());
        }
        self.repo.remove_session(user_id, claims.jti).await?;
        info!(%user_id, jti = %claims.jti, "session revoked");
        Ok(())
    }
}
