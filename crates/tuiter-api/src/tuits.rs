use axum::{
    Extension, Json,
    extract::{Path, State},
};
use tracing::{info, warn};

use tuiter_db::models::TuitRow;
use tuiter_db::{Database, Relation};
use tuiter_types::api::{CreateTuitRequest, DeleteResponse, UpdateTuitRequest};
use tuiter_types::models::Tuit;

use crate::auth::AppState;
use crate::db_call;
use crate::error::ApiError;
use crate::middleware::Viewer;

/// Convert rows to API tuits and, when `viewer` is set, mark which of them
/// the viewer has liked, disliked and bookmarked. One batched lookup per
/// relation regardless of how many tuits are listed.
pub(crate) fn annotate(db: &Database, viewer: Option<&str>, rows: Vec<TuitRow>) -> anyhow::Result<Vec<Tuit>> {
    let Some(viewer) = viewer else {
        return Ok(rows.into_iter().map(Tuit::from).collect());
    };

    let ids: Vec<String> = rows.iter().map(|r| r.id.clone()).collect();
    let liked = db.related_tuit_ids(Relation::Like, viewer, &ids)?;
    let disliked = db.related_tuit_ids(Relation::Dislike, viewer, &ids)?;
    let bookmarked = db.related_tuit_ids(Relation::Bookmark, viewer, &ids)?;

    Ok(rows
        .into_iter()
        .map(|row| {
            let mut tuit = Tuit::from(row);
            tuit.is_liked = Some(liked.contains(&tuit.id));
            tuit.is_disliked = Some(disliked.contains(&tuit.id));
            tuit.is_bookmarked = Some(bookmarked.contains(&tuit.id));
            tuit
        })
        .collect())
}

/// GET /tuits. Annotated for the signed-in caller, plain otherwise.
pub async fn list_tuits(
    State(state): State<AppState>,
    Extension(viewer): Extension<Viewer>,
) -> Result<Json<Vec<Tuit>>, ApiError> {
    let viewer = viewer.user_id().map(str::to_string);
    let tuits = db_call(&state, move |db| {
        let rows = db.get_all_tuits()?;
        annotate(db, viewer.as_deref(), rows)
    })
    .await?;
    Ok(Json(tuits))
}

/// GET /tuits/{tid}
pub async fn get_tuit(
    State(state): State<AppState>,
    Path(tid): Path<String>,
) -> Result<Json<Tuit>, ApiError> {
    let row = db_call(&state, move |db| db.get_tuit(&tid))
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(row.into()))
}

/// GET /users/{uid}/tuits. Annotated from the author's point of view.
pub async fn list_user_tuits(
    State(state): State<AppState>,
    Path(uid): Path<String>,
    Extension(viewer): Extension<Viewer>,
) -> Result<Json<Vec<Tuit>>, ApiError> {
    let uid = viewer.resolve(&uid)?;
    let tuits = db_call(&state, move |db| {
        let rows = db.get_tuits_by_user(&uid)?;
        annotate(db, Some(&uid), rows)
    })
    .await?;
    Ok(Json(tuits))
}

/// POST /users/{uid}/tuits
pub async fn create_tuit(
    State(state): State<AppState>,
    Path(uid): Path<String>,
    Extension(viewer): Extension<Viewer>,
    Json(req): Json<CreateTuitRequest>,
) -> Result<Json<Tuit>, ApiError> {
    let uid = viewer.resolve(&uid)?;
    if req.tuit.trim().is_empty() {
        return Err(ApiError::BadRequest);
    }
    let row = db_call(&state, move |db| db.create_tuit(&uid, &req.tuit))
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(row.into()))
}

/// PUT /tuits/{tid}
pub async fn update_tuit(
    State(state): State<AppState>,
    Path(tid): Path<String>,
    Json(req): Json<UpdateTuitRequest>,
) -> Result<Json<Tuit>, ApiError> {
    if req.tuit.trim().is_empty() {
        return Err(ApiError::BadRequest);
    }
    let row = db_call(&state, move |db| db.update_tuit_text(&tid, &req.tuit))
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(row.into()))
}

/// DELETE /tuits/{tid}
///
/// Removes the tuit and every like, dislike and bookmark pointing at it. The
/// four deletes are issued together; if one fails the request fails with
/// not found, but the others still run to completion.
pub async fn delete_tuit(
    State(state): State<AppState>,
    Path(tid): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let delete_relations = |rel: Relation| {
        let tid = tid.clone();
        db_call(&state, move |db| db.delete_relations_for_tuit(rel, &tid))
    };
    let delete_row = {
        let tid = tid.clone();
        db_call(&state, move |db| db.delete_tuit(&tid))
    };

    let (deleted_count, likes, dislikes, bookmarks) = tokio::try_join!(
        delete_row,
        delete_relations(Relation::Like),
        delete_relations(Relation::Dislike),
        delete_relations(Relation::Bookmark),
    )
    .map_err(|e| {
        warn!("Cascade delete of tuit {} failed: {}", tid, e);
        ApiError::NotFound
    })?;

    if deleted_count == 0 {
        return Err(ApiError::NotFound);
    }

    info!(
        "Deleted tuit {} ({} likes, {} dislikes, {} bookmarks)",
        tid, likes, dislikes, bookmarks
    );
    Ok(Json(DeleteResponse { deleted_count }))
}

/// DELETE /tuits/content/{content}/delete. Test cleanup helper; leaves
/// relation records behind for listings to skip.
pub async fn delete_tuits_by_content(
    State(state): State<AppState>,
    Path(content): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let deleted_count = db_call(&state, move |db| db.delete_tuits_by_content(&content)).await?;
    Ok(Json(DeleteResponse { deleted_count }))
}
