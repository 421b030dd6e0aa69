use axum::{
    Extension, Json,
    extract::{Path, State},
};

use tuiter_types::api::{CreateUserRequest, DeleteResponse, UpdateUserRequest};
use tuiter_types::models::User;

use crate::auth::{AppState, create_account};
use crate::db_call;
use crate::error::ApiError;
use crate::middleware::Viewer;

/// GET /users
pub async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<User>>, ApiError> {
    let rows = db_call(&state, |db| db.get_all_users()).await?;
    Ok(Json(rows.into_iter().map(User::from).collect()))
}

/// GET /users/{uid}
pub async fn get_user(
    State(state): State<AppState>,
    Path(uid): Path<String>,
    Extension(viewer): Extension<Viewer>,
) -> Result<Json<User>, ApiError> {
    let uid = viewer.resolve(&uid)?;
    let row = db_call(&state, move |db| db.get_user_by_id(&uid))
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(row.into()))
}

/// POST /users
pub async fn create_user(
    State(state): State<AppState>,
    Json(req): Json<CreateUserRequest>,
) -> Result<Json<User>, ApiError> {
    Ok(Json(create_account(&state, req).await?))
}

/// PUT /users/{uid}
pub async fn update_user(
    State(state): State<AppState>,
    Path(uid): Path<String>,
    Extension(viewer): Extension<Viewer>,
    Json(patch): Json<UpdateUserRequest>,
) -> Result<Json<User>, ApiError> {
    let uid = viewer.resolve(&uid)?;
    let row = db_call(&state, move |db| db.update_user(&uid, &patch))
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(row.into()))
}

/// DELETE /users/{uid}
pub async fn delete_user(
    State(state): State<AppState>,
    Path(uid): Path<String>,
    Extension(viewer): Extension<Viewer>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let uid = viewer.resolve(&uid)?;
    let deleted_count = db_call(&state, move |db| db.delete_user(&uid)).await?;
    if deleted_count == 0 {
        return Err(ApiError::NotFound);
    }
    Ok(Json(DeleteResponse { deleted_count }))
}

/// DELETE /users/username/{username}/delete. Test cleanup helper.
pub async fn delete_user_by_username(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let deleted_count = db_call(&state, move |db| db.delete_user_by_username(&username)).await?;
    Ok(Json(DeleteResponse { deleted_count }))
}
