use axum::{
    extract::{
        multipart::MultipartRejection, rejection::PathRejection, DefaultBodyLimit, Multipart,
        Path, State,
    },
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{
    dto::{DataResponse, ProfileForm, PurgeResponse, UserListResponse},
    repo_types::PublicUser,
    services,
};
use crate::{
    auth::extractors::{AdminUser, AuthUser},
    error::AppError,
    state::AppState,
};

type Reply = Result<Json<DataResponse<PublicUser>>, AppError>;
type Form = Result<Multipart, MultipartRejection>;
type UserId = Result<Path<Uuid>, PathRejection>;

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/create-user", post(create_user))
        .route("/update-users/:id", put(update_user))
        .route("/update-my-profile", put(update_my_profile))
        .route("/get-all-users", get(get_all_users))
        .route("/get-users/:id", get(get_user))
        .route("/my-profile", get(my_profile))
        .route("/delete-users/:id", delete(delete_user))
        .route("/delete-my-profile", delete(delete_my_profile))
        .route("/delete-all-users", delete(delete_all_users))
        .layer(DefaultBodyLimit::max(10 * 1024 * 1024)) // 10MB
}

fn reply(message: &'static str, user: impl Into<PublicUser>) -> Json<DataResponse<PublicUser>> {
    Json(DataResponse {
        status: true,
        message,
        data: user.into(),
    })
}

#[instrument(skip(state, caller, mp))]
pub async fn create_user(
    State(state): State<AppState>,
    caller: Option<AuthUser>,
    mp: Form,
) -> Result<(StatusCode, Json<DataResponse<PublicUser>>), AppError> {
    let (fields, image) = ProfileForm::from_multipart(mp?).await?.into_new_user()?;
    let caller_is_admin = caller.is_some_and(|c| c.user.is_admin);
    let user = services::register(&state, fields, image, caller_is_admin).await?;
    Ok((StatusCode::CREATED, reply("User created successfully", user)))
}

#[instrument(skip(state, admin, mp))]
pub async fn update_user(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    id: UserId,
    mp: Form,
) -> Reply {
    let Path(id) = id?;
    let (changes, image) = ProfileForm::from_multipart(mp?).await?.into_changes()?;
    let user = services::update_profile(&state, id, changes, image).await?;
    info!(admin = %admin.id, %id, "user updated by admin");
    Ok(reply("User updated successfully", user))
}

#[instrument(skip(state, caller, mp))]
pub async fn update_my_profile(
    State(state): State<AppState>,
    caller: AuthUser,
    mp: Form,
) -> Reply {
    let (changes, image) = ProfileForm::from_multipart(mp?).await?.into_changes()?;
    if changes.is_admin.is_some() && !caller.user.is_admin {
        warn!(id = %caller.user.id, "non-admin tried to change admin flag");
        return Err(AppError::Authorization);
    }
    let user = services::update_profile(&state, caller.user.id, changes, image).await?;
    Ok(reply("User profile updated successfully", user))
}

#[instrument(skip(state, _admin))]
pub async fn get_all_users(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<Json<UserListResponse>, AppError> {
    let users = state.users.list().await?;
    let total = state.users.count().await?;
    Ok(Json(UserListResponse {
        status: true,
        total,
        data: users.into_iter().map(PublicUser::from).collect(),
    }))
}

#[instrument(skip(state, _admin))]
pub async fn get_user(
    State(state): State<AppState>,
    _admin: AdminUser,
    id: UserId,
) -> Reply {
    let Path(id) = id?;
    let user = state
        .users
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("user {id}")))?;
    Ok(reply("User retrieved successfully", user))
}

#[instrument(skip(caller))]
pub async fn my_profile(caller: AuthUser) -> Reply {
    Ok(reply("User profile retrieved successfully", caller.user))
}

#[instrument(skip(state, admin))]
pub async fn delete_user(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    id: UserId,
) -> Reply {
    let Path(id) = id?;
    let user = services::delete_user(&state, id).await?;
    info!(admin = %admin.id, %id, "user deleted by admin");
    Ok(reply("User deleted successfully", user))
}

#[instrument(skip(state, caller))]
pub async fn delete_my_profile(State(state): State<AppState>, caller: AuthUser) -> Reply {
    let user = services::delete_user(&state, caller.user.id).await?;
    Ok(reply("User profile deleted successfully", user))
}

#[instrument(skip(state, _admin))]
pub async fn delete_all_users(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<Json<PurgeResponse>, AppError> {
    let deleted = services::delete_all_users(&state).await?;
    Ok(Json(PurgeResponse {
        status: true,
        message: "All users and associated images have been deleted",
        deleted,
    }))
}
