use axum::{
    Extension, Json,
    extract::{Path, State},
};

use tuiter_types::api::DeleteResponse;
use tuiter_types::models::Follow;

use crate::auth::AppState;
use crate::db_call;
use crate::error::ApiError;
use crate::middleware::Viewer;

/// GET /users/{uid}/follows: users that uid follows.
pub async fn list_following(
    State(state): State<AppState>,
    Path(uid): Path<String>,
    Extension(viewer): Extension<Viewer>,
) -> Result<Json<Vec<Follow>>, ApiError> {
    let uid = viewer.resolve(&uid)?;
    let rows = db_call(&state, move |db| db.get_following(&uid)).await?;
    Ok(Json(rows.into_iter().map(Follow::from).collect()))
}

/// GET /users/{uid}/followers
pub async fn list_followers(
    State(state): State<AppState>,
    Path(uid): Path<String>,
    Extension(viewer): Extension<Viewer>,
) -> Result<Json<Vec<Follow>>, ApiError> {
    let uid = viewer.resolve(&uid)?;
    let rows = db_call(&state, move |db| db.get_followers(&uid)).await?;
    Ok(Json(rows.into_iter().map(Follow::from).collect()))
}

/// GET /follows
pub async fn list_all_follows(State(state): State<AppState>) -> Result<Json<Vec<Follow>>, ApiError> {
    let rows = db_call(&state, |db| db.get_all_follows()).await?;
    Ok(Json(rows.into_iter().map(Follow::from).collect()))
}

/// POST /users/{uid}/follows/{other}: uid starts following other.
pub async fn follow(
    State(state): State<AppState>,
    Path((uid, other)): Path<(String, String)>,
    Extension(viewer): Extension<Viewer>,
) -> Result<Json<Follow>, ApiError> {
    let uid = viewer.resolve(&uid)?;
    let other = viewer.resolve(&other)?;
    let row = db_call(&state, move |db| db.follow(&uid, &other))
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(row.into()))
}

/// DELETE /users/{uid}/follows/{other}
pub async fn unfollow(
    State(state): State<AppState>,
    Path((uid, other)): Path<(String, String)>,
    Extension(viewer): Extension<Viewer>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let uid = viewer.resolve(&uid)?;
    let other = viewer.resolve(&other)?;
    let deleted_count = db_call(&state, move |db| db.unfollow(&uid, &other)).await?;
    if deleted_count == 0 {
        return Err(ApiError::NotFound);
    }
    Ok(Json(DeleteResponse { deleted_count }))
}
