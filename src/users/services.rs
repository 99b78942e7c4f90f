use tracing::{info, warn};
use uuid::Uuid;

use super::repo_types::{NewUser, User, UserChanges};
use crate::{
    error::AppError,
    images::services::{check_upload, retire_image, upload_image, UploadItem, PLACEHOLDER_IMAGE},
    state::AppState,
};

/// Two-phase registration: the record is stored with a placeholder image
/// first, then pointed at the uploaded image. If the upload fails the record
/// stays with its placeholder and the upload error is returned.
pub async fn register(
    state: &AppState,
    mut fields: NewUser,
    image: Option<UploadItem>,
    caller_is_admin: bool,
) -> Result<User, AppError> {
    let image = image.ok_or_else(|| AppError::validation("image", "No file uploaded"))?;
    check_upload(&image)?;

    if fields.is_admin
        && !caller_is_admin
        && !state.config.is_admin_email(&fields.email.trim().to_lowercase())
    {
        warn!("admin flag dropped on self-registration");
        fields.is_admin = false;
    }

    let user = state.users.create(fields, PLACEHOLDER_IMAGE).await?;

    let url = match upload_image(state.media.as_ref(), image).await {
        Ok(url) => url,
        Err(e) => {
            warn!(id = %user.id, "user stored with placeholder image; upload failed");
            return Err(e);
        }
    };

    let Some(user) = state.users.set_image(user.id, &url).await? else {
        retire_image(state.media.as_ref(), &url).await;
        return Err(AppError::NotFound(format!("user {}", user.id)));
    };
    info!(id = %user.id, user_id = %user.user_id, "user created");
    Ok(user)
}

/// Applies a partial update. A new image replaces the old one, which is then
/// retired from the media host on a best-effort basis.
pub async fn update_profile(
    state: &AppState,
    id: Uuid,
    mut changes: UserChanges,
    image: Option<UploadItem>,
) -> Result<User, AppError> {
    let existing = state
        .users
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("user {id}")))?;

    let new_url = match image {
        Some(item) => Some(upload_image(state.media.as_ref(), item).await?),
        None => None,
    };
    changes.image = new_url.clone();

    let updated = match state.users.update(id, changes).await {
        Ok(Some(u)) => u,
        outcome => {
            // The fresh upload is orphaned either way.
            if let Some(url) = &new_url {
                retire_image(state.media.as_ref(), url).await;
            }
            return match outcome {
                Err(e) => Err(e),
                _ => Err(AppError::NotFound(format!("user {id}"))),
            };
        }
    };

    if new_url.is_some() {
        retire_image(state.media.as_ref(), &existing.image).await;
    }
    info!(%id, "user updated");
    Ok(updated)
}

/// Deletes the record, then tries to delete its image. The record is gone
/// whatever the media host answers.
pub async fn delete_user(state: &AppState, id: Uuid) -> Result<User, AppError> {
    let deleted = state
        .users
        .delete(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("user {id}")))?;
    retire_image(state.media.as_ref(), &deleted.image).await;
    info!(%id, "user deleted");
    Ok(deleted)
}

pub async fn delete_all_users(state: &AppState) -> Result<usize, AppError> {
    let deleted = state.users.delete_all().await?;
    if deleted.is_empty() {
        return Err(AppError::NotFound("users".into()));
    }
    for user in &deleted {
        retire_image(state.media.as_ref(), &user.image).await;
    }
    info!(count = deleted.len(), "all users deleted");
    Ok(deleted.len())
}
