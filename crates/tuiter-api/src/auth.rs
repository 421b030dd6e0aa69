use std::sync::Arc;

use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::{SaltString, rand_core::OsRng}};
use axum::{Extension, Json, extract::State, http::StatusCode};
use jsonwebtoken::{EncodingKey, Header, encode};
use tracing::{error, info};

use tuiter_db::Database;
use tuiter_db::models::NewUser;
use tuiter_gateway::PresenceMap;
use tuiter_types::api::{AuthResponse, Claims, CreateUserRequest, LoginRequest};
use tuiter_types::models::User;

use crate::error::ApiError;
use crate::middleware::Viewer;
use crate::db_call;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
    pub presence: PresenceMap,
}

/// POST /api/auth/signup
pub async fn signup(
    State(state): State<AppState>,
    Json(req): Json<CreateUserRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let user = create_account(&state, req).await?;
    let token = issue_token(&state, &user)?;
    info!("{} ({}) signed up", user.username, user.id);
    Ok(Json(AuthResponse { user, token }))
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let username = req.username.clone();
    let row = db_call(&state, move |db| db.get_user_by_username(&username))
        .await?
        .ok_or(ApiError::Unauthorized)?;

    if !verify_password(&req.password, &row.password)? {
        return Err(ApiError::Unauthorized);
    }

    let user: User = row.into();
    let token = issue_token(&state, &user)?;
    Ok(Json(AuthResponse { user, token }))
}

/// POST /api/auth/profile
pub async fn profile(
    State(state): State<AppState>,
    Extension(viewer): Extension<Viewer>,
) -> Result<Json<User>, ApiError> {
    let user_id = viewer.require()?.sub.clone();
    let row = db_call(&state, move |db| db.get_user_by_id(&user_id))
        .await?
        .ok_or(ApiError::Unauthorized)?;
    Ok(Json(row.into()))
}

/// POST /api/auth/logout. Tokens are stateless; the client drops its copy.
pub async fn logout(Extension(viewer): Extension<Viewer>) -> StatusCode {
    if let Some(claims) = viewer.0 {
        info!("{} ({}) logged out", claims.username, claims.sub);
    }
    StatusCode::OK
}

/// Validates, hashes and stores a new account. Shared by signup and
/// `POST /users`.
pub(crate) async fn create_account(state: &AppState, req: CreateUserRequest) -> Result<User, ApiError> {
    if req.username.trim().is_empty() || req.password.is_empty() {
        return Err(ApiError::BadRequest);
    }

    let username = req.username.clone();
    if db_call(state, move |db| db.get_user_by_username(&username))
        .await?
        .is_some()
    {
        return Err(ApiError::Conflict);
    }

    let password_hash = hash_password(&req.password)?;
    let new_user = NewUser::from_request(req, password_hash);
    let row = db_call(state, move |db| db.create_user(&new_user))
        .await?
        .ok_or(ApiError::Conflict)?;
    Ok(row.into())
}

pub(crate) fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| {
            error!("Password hashing failed: {}", e);
            ApiError::Internal
        })
}

fn verify_password(password: &str, stored_hash: &str) -> Result<bool, ApiError> {
    let parsed_hash = PasswordHash::new(stored_hash).map_err(|e| {
        error!("Stored password hash is unreadable: {}", e);
        ApiError::Internal
    })?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

fn issue_token(state: &AppState, user: &User) -> Result<String, ApiError> {
    create_token(&state.jwt_secret, &user.id, &user.username).map_err(|e| {
        error!("Token signing failed: {}", e);
        ApiError::Internal
    })
}

pub(crate) fn create_token(secret: &str, user_id: &str, username: &str) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user_id.to_string(),
        username: username.to_string(),
        exp: (chrono::Utc::now() + chrono::Duration::days(30)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}
