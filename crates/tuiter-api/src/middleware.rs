use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{DecodingKey, Validation, decode};
use tracing::debug;

use tuiter_types::api::Claims;

use crate::auth::AppState;
use crate::error::ApiError;

/// The authenticated identity of the caller, if any. Attached to every
/// request by `attach_viewer`.
#[derive(Debug, Clone, Default)]
pub struct Viewer(pub Option<Claims>);

impl Viewer {
    pub fn user_id(&self) -> Option<&str> {
        self.0.as_ref().map(|c| c.sub.as_str())
    }

    /// Resolve a user path segment. `me` and `my` stand for the caller and
    /// fail with `Unavailable` when nobody is signed in.
    pub fn resolve(&self, uid: &str) -> Result<String, ApiError> {
        match uid {
            "me" | "my" => self
                .user_id()
                .map(str::to_string)
                .ok_or(ApiError::Unavailable),
            other => Ok(other.to_string()),
        }
    }

    pub fn require(&self) -> Result<&Claims, ApiError> {
        self.0.as_ref().ok_or(ApiError::Unauthorized)
    }
}

/// Decode the bearer token, if one is present and valid, into a `Viewer`
/// extension. Requests are never rejected here; handlers that need an
/// identity check for one themselves.
pub async fn attach_viewer(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let claims = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .and_then(|token| decode_token(&state.jwt_secret, token));

    req.extensions_mut().insert(Viewer(claims));
    next.run(req).await
}

fn decode_token(secret: &str, token: &str) -> Option<Claims> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| debug!("Ignoring invalid bearer token: {}", e))
    .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signed_in(id: &str) -> Viewer {
        Viewer(Some(Claims { sub: id.into(), username: "alice".into(), exp: 0 }))
    }

    #[test]
    fn me_resolves_to_the_caller() {
        assert_eq!(signed_in("u1").resolve("me").unwrap(), "u1");
        assert_eq!(signed_in("u1").resolve("my").unwrap(), "u1");
        assert_eq!(signed_in("u1").resolve("u2").unwrap(), "u2");
    }

    #[test]
    fn me_without_identity_is_unavailable() {
        let anon = Viewer::default();
        assert_eq!(anon.resolve("me"), Err(ApiError::Unavailable));
        assert_eq!(anon.resolve("u2").unwrap(), "u2");
        assert_eq!(anon.require().unwrap_err(), ApiError::Unauthorized);
    }

    #[test]
    fn token_round_trips_through_decode() {
        let token = crate::auth::create_token("secret", "u1", "alice").unwrap();
        let claims = decode_token("secret", &token).unwrap();
        assert_eq!(claims.sub, "u1");
        assert!(decode_token("other-secret", &token).is_none());
    }
}
