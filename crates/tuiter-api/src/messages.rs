use axum::{
    Extension, Json,
    extract::{Path, State},
};

use tuiter_types::api::{DeleteResponse, SendMessageRequest};
use tuiter_types::models::Message;

use crate::auth::AppState;
use crate::db_call;
use crate::error::ApiError;
use crate::middleware::Viewer;

/// GET /users/{uid}/messages: messages uid has sent.
pub async fn list_sent(
    State(state): State<AppState>,
    Path(uid): Path<String>,
    Extension(viewer): Extension<Viewer>,
) -> Result<Json<Vec<Message>>, ApiError> {
    let uid = viewer.resolve(&uid)?;
    let rows = db_call(&state, move |db| db.get_messages_sent_by(&uid)).await?;
    Ok(Json(rows.into_iter().map(Message::from).collect()))
}

/// GET /messages/users/{uid}: messages uid has received.
pub async fn list_received(
    State(state): State<AppState>,
    Path(uid): Path<String>,
    Extension(viewer): Extension<Viewer>,
) -> Result<Json<Vec<Message>>, ApiError> {
    let uid = viewer.resolve(&uid)?;
    let rows = db_call(&state, move |db| db.get_messages_sent_to(&uid)).await?;
    Ok(Json(rows.into_iter().map(Message::from).collect()))
}

/// POST /users/{uid}/messages/{other}
///
/// Persists only. Live delivery goes through the gateway's `sendMsg`.
pub async fn send_message(
    State(state): State<AppState>,
    Path((uid, other)): Path<(String, String)>,
    Extension(viewer): Extension<Viewer>,
    Json(req): Json<SendMessageRequest>,
) -> Result<Json<Message>, ApiError> {
    let uid = viewer.resolve(&uid)?;
    let other = viewer.resolve(&other)?;
    if req.message.is_empty() {
        return Err(ApiError::BadRequest);
    }
    let row = db_call(&state, move |db| db.insert_message(&uid, &other, &req.message))
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(row.into()))
}

/// DELETE /messages/{mid}
pub async fn delete_message(
    State(state): State<AppState>,
    Path(mid): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let deleted_count = db_call(&state, move |db| db.delete_message(&mid)).await?;
    if deleted_count == 0 {
        return Err(ApiError::NotFound);
    }
    Ok(Json(DeleteResponse { deleted_count }))
}
