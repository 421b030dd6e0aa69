//! Likes, dislikes and bookmarks: toggles, bookmark set/clear and the listings
//! built on them.

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use tracing::{debug, warn};

use tuiter_db::{Database, Relation, Toggled};
use tuiter_types::models::{Dislike, Like, Tuit, User};

use crate::auth::AppState;
use crate::error::ApiError;
use crate::middleware::Viewer;
use crate::tuits::annotate;
use crate::{db_call, run_blocking};

/// One of the store's relation changes: toggle, set or clear.
type Change = fn(&Database, Relation, &str, &str) -> anyhow::Result<Toggled>;

/// Shared path for every relation change. Any store failure, including a
/// missing tuit or user, is reported as not found.
async fn change_relation(
    state: &AppState,
    viewer: &Viewer,
    rel: Relation,
    uid: &str,
    tid: String,
    change: Change,
) -> Result<StatusCode, ApiError> {
    let uid = viewer.resolve(uid)?;
    let (user_id, tuit_id) = (uid.clone(), tid.clone());
    match run_blocking(state, move |db| change(db, rel, &user_id, &tuit_id)).await? {
        Ok(toggled) => {
            debug!(?rel, %uid, %tid, ?toggled, "relation updated");
            Ok(StatusCode::OK)
        }
        Err(e) => {
            warn!("{:?} change by {} on {} failed: {:#}", rel, uid, tid, e);
            Err(ApiError::NotFound)
        }
    }
}

async fn toggle(
    state: &AppState,
    viewer: &Viewer,
    rel: Relation,
    uid: &str,
    tid: String,
) -> Result<StatusCode, ApiError> {
    change_relation(state, viewer, rel, uid, tid, Database::toggle).await
}

/// PUT /users/{uid}/likes/{tid}
pub async fn toggle_like(
    State(state): State<AppState>,
    Path((uid, tid)): Path<(String, String)>,
    Extension(viewer): Extension<Viewer>,
) -> Result<StatusCode, ApiError> {
    toggle(&state, &viewer, Relation::Like, &uid, tid).await
}

/// PUT /users/{uid}/dislikes/{tid}. Also withdraws the user's like.
pub async fn toggle_dislike(
    State(state): State<AppState>,
    Path((uid, tid)): Path<(String, String)>,
    Extension(viewer): Extension<Viewer>,
) -> Result<StatusCode, ApiError> {
    toggle(&state, &viewer, Relation::Dislike, &uid, tid).await
}

/// PUT /users/{uid}/bookmarks/{tid}
pub async fn toggle_bookmark(
    State(state): State<AppState>,
    Path((uid, tid)): Path<(String, String)>,
    Extension(viewer): Extension<Viewer>,
) -> Result<StatusCode, ApiError> {
    toggle(&state, &viewer, Relation::Bookmark, &uid, tid).await
}

/// POST /users/{uid}/bookmarks/{tid}. Bookmarking twice is a no-op.
pub async fn bookmark(
    State(state): State<AppState>,
    Path((uid, tid)): Path<(String, String)>,
    Extension(viewer): Extension<Viewer>,
) -> Result<StatusCode, ApiError> {
    change_relation(&state, &viewer, Relation::Bookmark, &uid, tid, Database::set_relation).await
}

/// DELETE /users/{uid}/bookmarks/{tid}. Removing a missing bookmark is a no-op.
pub async fn unbookmark(
    State(state): State<AppState>,
    Path((uid, tid)): Path<(String, String)>,
    Extension(viewer): Extension<Viewer>,
) -> Result<StatusCode, ApiError> {
    change_relation(&state, &viewer, Relation::Bookmark, &uid, tid, Database::clear_relation).await
}

/// Tuits the user holds `rel` with, annotated from that user's point of
/// view. `tag` narrows the result to one hashtag.
async fn related_tuits(
    state: &AppState,
    viewer: &Viewer,
    rel: Relation,
    uid: &str,
    tag: Option<String>,
) -> Result<Json<Vec<Tuit>>, ApiError> {
    let uid = viewer.resolve(uid)?;
    let tuits = db_call(state, move |db| {
        let mut rows = db.get_tuits_for_user(rel, &uid)?;
        if let Some(tag) = tag {
            rows.retain(|row| row.tag == tag);
        }
        annotate(db, Some(&uid), rows)
    })
    .await?;
    Ok(Json(tuits))
}

/// GET /users/{uid}/likes
pub async fn list_liked_tuits(
    State(state): State<AppState>,
    Path(uid): Path<String>,
    Extension(viewer): Extension<Viewer>,
) -> Result<Json<Vec<Tuit>>, ApiError> {
    related_tuits(&state, &viewer, Relation::Like, &uid, None).await
}

/// GET /users/{uid}/dislikes
pub async fn list_disliked_tuits(
    State(state): State<AppState>,
    Path(uid): Path<String>,
    Extension(viewer): Extension<Viewer>,
) -> Result<Json<Vec<Tuit>>, ApiError> {
    related_tuits(&state, &viewer, Relation::Dislike, &uid, None).await
}

/// GET /users/{uid}/bookmarks
pub async fn list_bookmarked_tuits(
    State(state): State<AppState>,
    Path(uid): Path<String>,
    Extension(viewer): Extension<Viewer>,
) -> Result<Json<Vec<Tuit>>, ApiError> {
    related_tuits(&state, &viewer, Relation::Bookmark, &uid, None).await
}

/// GET /users/{uid}/bookmarks/tags/{tag}
pub async fn list_bookmarked_tuits_by_tag(
    State(state): State<AppState>,
    Path((uid, tag)): Path<(String, String)>,
    Extension(viewer): Extension<Viewer>,
) -> Result<Json<Vec<Tuit>>, ApiError> {
    related_tuits(&state, &viewer, Relation::Bookmark, &uid, Some(tag)).await
}

/// GET /users/{uid}/likes/{tid}. `null` when the user has not liked it.
pub async fn find_user_like(
    State(state): State<AppState>,
    Path((uid, tid)): Path<(String, String)>,
    Extension(viewer): Extension<Viewer>,
) -> Result<Json<Option<Like>>, ApiError> {
    let uid = viewer.resolve(&uid)?;
    let row = db_call(&state, move |db| db.find_relation(Relation::Like, &uid, &tid)).await?;
    Ok(Json(row.map(|r| Like { id: r.id, tuit: r.tuit_id, liked_by: r.user_id })))
}

/// GET /users/{uid}/dislikes/{tid}. `null` when the user has not disliked it.
pub async fn find_user_dislike(
    State(state): State<AppState>,
    Path((uid, tid)): Path<(String, String)>,
    Extension(viewer): Extension<Viewer>,
) -> Result<Json<Option<Dislike>>, ApiError> {
    let uid = viewer.resolve(&uid)?;
    let row = db_call(&state, move |db| db.find_relation(Relation::Dislike, &uid, &tid)).await?;
    Ok(Json(row.map(|r| Dislike { id: r.id, tuit: r.tuit_id, disliked_by: r.user_id })))
}

/// GET /tuits/{tid}/likes
pub async fn list_users_who_liked(
    State(state): State<AppState>,
    Path(tid): Path<String>,
) -> Result<Json<Vec<User>>, ApiError> {
    let rows = db_call(&state, move |db| db.get_users_for_tuit(Relation::Like, &tid)).await?;
    Ok(Json(rows.into_iter().map(User::from).collect()))
}
