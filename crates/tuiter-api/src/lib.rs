pub mod auth;
pub mod error;
pub mod follows;
pub mod messages;
pub mod middleware;
pub mod relations;
pub mod router;
pub mod tuits;
pub mod users;

use tracing::error;

use tuiter_db::Database;

use crate::auth::AppState;
use crate::error::ApiError;

/// Run a store call on the blocking pool and hand back its raw result.
pub(crate) async fn run_blocking<F, T>(state: &AppState, f: F) -> Result<anyhow::Result<T>, ApiError>
where
    F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state.db))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal
        })
}

/// Like `run_blocking`, treating any store error as an internal error.
pub(crate) async fn db_call<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    run_blocking(state, f).await?.map_err(|e| {
        error!("DB error: {:#}", e);
        ApiError::Internal
    })
}
