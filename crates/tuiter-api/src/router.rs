use axum::{
    Router,
    extract::{State, WebSocketUpgrade},
    middleware,
    response::IntoResponse,
    routing::{delete, get, post, put},
};

use tuiter_gateway::connection;

use crate::auth::{self, AppState};
use crate::middleware::attach_viewer;
use crate::{follows, messages, relations, tuits, users};

/// Every REST route plus the `/gateway` WebSocket, with the caller's identity
/// attached to each request.
pub fn router(state: AppState) -> Router {
    let auth_routes = Router::new()
        .route("/api/auth/signup", post(auth::signup))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/profile", post(auth::profile))
        .route("/api/auth/logout", post(auth::logout));

    let user_routes = Router::new()
        .route("/users", get(users::list_users).post(users::create_user))
        .route(
            "/users/{uid}",
            get(users::get_user).put(users::update_user).delete(users::delete_user),
        )
        .route("/users/username/{username}/delete", delete(users::delete_user_by_username));

    let tuit_routes = Router::new()
        .route("/tuits", get(tuits::list_tuits))
        .route(
            "/tuits/{tid}",
            get(tuits::get_tuit).put(tuits::update_tuit).delete(tuits::delete_tuit),
        )
        .route("/tuits/content/{content}/delete", delete(tuits::delete_tuits_by_content))
        .route("/tuits/{tid}/likes", get(relations::list_users_who_liked))
        .route("/users/{uid}/tuits", get(tuits::list_user_tuits).post(tuits::create_tuit));

    let relation_routes = Router::new()
        .route("/users/{uid}/likes", get(relations::list_liked_tuits))
        .route(
            "/users/{uid}/likes/{tid}",
            get(relations::find_user_like).put(relations::toggle_like),
        )
        .route("/users/{uid}/dislikes", get(relations::list_disliked_tuits))
        .route(
            "/users/{uid}/dislikes/{tid}",
            get(relations::find_user_dislike).put(relations::toggle_dislike),
        )
        .route("/users/{uid}/bookmarks", get(relations::list_bookmarked_tuits))
        .route(
            "/users/{uid}/bookmarks/{tid}",
            put(relations::toggle_bookmark)
                .post(relations::bookmark)
                .delete(relations::unbookmark),
        )
        .route(
            "/users/{uid}/bookmarks/tags/{tag}",
            get(relations::list_bookmarked_tuits_by_tag),
        );

    let social_routes = Router::new()
        .route("/follows", get(follows::list_all_follows))
        .route("/users/{uid}/follows", get(follows::list_following))
        .route("/users/{uid}/followers", get(follows::list_followers))
        .route(
            "/users/{uid}/follows/{other}",
            post(follows::follow).delete(follows::unfollow),
        )
        .route("/users/{uid}/messages", get(messages::list_sent))
        .route("/users/{uid}/messages/{other}", post(messages::send_message))
        .route("/messages/users/{uid}", get(messages::list_received))
        .route("/messages/{mid}", delete(messages::delete_message));

    Router::new()
        .merge(auth_routes)
        .merge(user_routes)
        .merge(tuit_routes)
        .merge(relation_routes)
        .merge(social_routes)
        .route("/gateway", get(ws_upgrade))
        .layer(middleware::from_fn_with_state(state.clone(), attach_viewer))
        .with_state(state)
}

async fn ws_upgrade(State(state): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    let presence = state.presence.clone();
    ws.on_upgrade(move |socket| connection::handle_connection(socket, presence))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use tuiter_db::{Database, Relation};
    use tuiter_gateway::PresenceMap;

    use super::*;
    use crate::auth::AppStateInner;

    fn app_with_state() -> (Router, AppState) {
        let state = Arc::new(AppStateInner {
            db: Database::open_in_memory().unwrap(),
            jwt_secret: "test-secret".into(),
            presence: PresenceMap::new(),
        });
        (router(state.clone()), state)
    }

    fn app() -> Router {
        app_with_state().0
    }

    async fn call(
        router: &Router,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(t) = token {
            builder = builder.header("authorization", format!("Bearer {}", t));
        }
        if body.is_some() {
            builder = builder.header("content-type", "application/json");
        }
        let req = match body {
            Some(b) => builder.body(Body::from(b.to_string())).unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let resp = router.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), 1024 * 1024).await.unwrap();
        let json = if bytes.is_empty() {
            json!(null)
        } else {
            serde_json::from_slice(&bytes).unwrap_or(json!(null))
        };
        (status, json)
    }

    /// Sign up `username` and return (user id, token).
    async fn signup(router: &Router, username: &str) -> (String, String) {
        let (status, body) = call(
            router,
            "POST",
            "/api/auth/signup",
            None,
            Some(json!({ "username": username, "password": "pw" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        (
            body["id"].as_str().unwrap().to_string(),
            body["token"].as_str().unwrap().to_string(),
        )
    }

    async fn post_tuit(router: &Router, token: &str, text: &str) -> String {
        let (status, body) =
            call(router, "POST", "/users/me/tuits", Some(token), Some(json!({ "tuit": text }))).await;
        assert_eq!(status, StatusCode::OK);
        body["id"].as_str().unwrap().to_string()
    }

    async fn stats(router: &Router, tid: &str) -> Value {
        let (status, body) = call(router, "GET", &format!("/tuits/{}", tid), None, None).await;
        assert_eq!(status, StatusCode::OK);
        body["stats"].clone()
    }

    #[tokio::test]
    async fn duplicate_signup_is_forbidden() {
        let app = app();
        let body = json!({ "username": "alice", "password": "pw" });

        let (status, first) = call(&app, "POST", "/api/auth/signup", None, Some(body.clone())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(first["password"], "");
        assert!(first["token"].is_string());

        let (status, _) = call(&app, "POST", "/api/auth/signup", None, Some(body)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn login_checks_the_password() {
        let app = app();
        signup(&app, "alice").await;

        let good = json!({ "username": "alice", "password": "pw" });
        let (status, body) = call(&app, "POST", "/api/auth/login", None, Some(good)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["username"], "alice");
        assert_eq!(body["password"], "");

        let bad = json!({ "username": "alice", "password": "nope" });
        let (status, _) = call(&app, "POST", "/api/auth/login", None, Some(bad)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let unknown = json!({ "username": "bob", "password": "pw" });
        let (status, _) = call(&app, "POST", "/api/auth/login", None, Some(unknown)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn profile_requires_a_token() {
        let app = app();
        let (id, token) = signup(&app, "alice").await;

        let (status, body) = call(&app, "POST", "/api/auth/profile", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], id.as_str());

        let (status, _) = call(&app, "POST", "/api/auth/profile", None, None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn new_tuit_carries_its_hashtag() {
        let app = app();
        let (_, token) = signup(&app, "alice").await;
        let (status, body) = call(
            &app,
            "POST",
            "/users/me/tuits",
            Some(&token),
            Some(json!({ "tuit": "shipping #rust today" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["tag"], "rust");
        assert_eq!(body["postedBy"]["username"], "alice");
    }

    #[tokio::test]
    async fn like_toggles_on_and_off() {
        let app = app();
        let (_, token) = signup(&app, "alice").await;
        let tid = post_tuit(&app, &token, "hello").await;
        let uri = format!("/users/me/likes/{}", tid);

        let (status, _) = call(&app, "PUT", &uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(stats(&app, &tid).await["likes"], 1);

        let (_, liked) = call(&app, "GET", "/users/me/likes", Some(&token), None).await;
        assert_eq!(liked.as_array().unwrap().len(), 1);
        assert_eq!(liked[0]["isLiked"], true);

        let (status, _) = call(&app, "PUT", &uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(stats(&app, &tid).await["likes"], 0);

        let (_, liked) = call(&app, "GET", "/users/me/likes", Some(&token), None).await;
        assert!(liked.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn dislike_withdraws_a_like() {
        let app = app();
        let (_, token) = signup(&app, "alice").await;
        let tid = post_tuit(&app, &token, "hello").await;

        call(&app, "PUT", &format!("/users/me/likes/{}", tid), Some(&token), None).await;
        let (status, _) =
            call(&app, "PUT", &format!("/users/me/dislikes/{}", tid), Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);

        let stats = stats(&app, &tid).await;
        assert_eq!(stats["likes"], 0);
        assert_eq!(stats["dislikes"], 1);

        let (_, like) = call(&app, "GET", &format!("/users/me/likes/{}", tid), Some(&token), None).await;
        assert!(like.is_null());
        let (_, dislike) =
            call(&app, "GET", &format!("/users/me/dislikes/{}", tid), Some(&token), None).await;
        assert_eq!(dislike["tuit"], tid.as_str());
    }

    #[tokio::test]
    async fn me_without_a_token_is_unavailable() {
        let app = app();
        let (status, _) = call(&app, "PUT", "/users/me/likes/whatever", None, None).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        let (status, _) = call(&app, "GET", "/users/my/bookmarks", None, None).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn toggle_on_missing_tuit_is_not_found() {
        let app = app();
        let (_, token) = signup(&app, "alice").await;
        let (status, _) = call(&app, "PUT", "/users/me/bookmarks/no-such-tuit", Some(&token), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn deleting_a_tuit_removes_its_relations() {
        let (app, state) = app_with_state();
        let (alice_id, alice) = signup(&app, "alice").await;
        let (bob_id, bob) = signup(&app, "bob").await;
        let tid = post_tuit(&app, &alice, "short lived").await;
        call(&app, "PUT", &format!("/users/me/likes/{}", tid), Some(&alice), None).await;
        call(&app, "PUT", &format!("/users/me/bookmarks/{}", tid), Some(&alice), None).await;
        call(&app, "PUT", &format!("/users/me/dislikes/{}", tid), Some(&bob), None).await;
        assert_eq!(stats(&app, &tid).await["dislikes"], 1);

        let (status, body) = call(&app, "DELETE", &format!("/tuits/{}", tid), None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["deletedCount"], 1);

        let (status, _) = call(&app, "GET", &format!("/tuits/{}", tid), None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (_, liked) = call(&app, "GET", &format!("/users/{}/likes", alice_id), None, None).await;
        assert!(liked.as_array().unwrap().is_empty());
        let (_, disliked) = call(&app, "GET", &format!("/users/{}/dislikes", bob_id), None, None).await;
        assert!(disliked.as_array().unwrap().is_empty());
        let (_, likers) = call(&app, "GET", &format!("/tuits/{}/likes", tid), None, None).await;
        assert!(likers.as_array().unwrap().is_empty());

        let db = &state.db;
        assert!(db.find_relation(Relation::Like, &alice_id, &tid).unwrap().is_none());
        assert!(db.find_relation(Relation::Bookmark, &alice_id, &tid).unwrap().is_none());
        assert!(db.find_relation(Relation::Dislike, &bob_id, &tid).unwrap().is_none());
        for rel in Relation::ALL {
            assert_eq!(db.count_relation(rel, &tid).unwrap(), 0);
        }
    }

    #[tokio::test]
    async fn deleting_missing_records_is_not_found() {
        let app = app();
        let (alice_id, alice) = signup(&app, "alice").await;

        let (status, _) = call(&app, "DELETE", "/tuits/no-such-tuit", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = call(&app, "DELETE", "/messages/no-such-msg", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = call(&app, "DELETE", "/users/no-such-user", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) =
            call(&app, "DELETE", "/users/me/follows/no-such-user", Some(&alice), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = call(&app, "DELETE", &format!("/users/{}", alice_id), None, None).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = call(&app, "DELETE", &format!("/users/{}", alice_id), None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn racing_signups_yield_one_account() {
        let app = app();
        let attempts: Vec<_> = (0..8)
            .map(|_| {
                let app = app.clone();
                tokio::spawn(async move {
                    let body = json!({ "username": "alice", "password": "pw" });
                    call(&app, "POST", "/api/auth/signup", None, Some(body)).await.0
                })
            })
            .collect();

        let mut statuses = Vec::new();
        for attempt in attempts {
            statuses.push(attempt.await.unwrap());
        }
        let created = statuses.iter().filter(|s| **s == StatusCode::OK).count();
        let refused = statuses.iter().filter(|s| **s == StatusCode::FORBIDDEN).count();
        assert_eq!((created, refused), (1, 7), "statuses: {:?}", statuses);

        let (_, users) = call(&app, "GET", "/users", None, None).await;
        assert_eq!(users.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn bookmark_and_unbookmark_are_idempotent() {
        let app = app();
        let (_, token) = signup(&app, "alice").await;
        let tid = post_tuit(&app, &token, "keep this").await;
        let uri = format!("/users/me/bookmarks/{}", tid);

        for _ in 0..2 {
            let (status, _) = call(&app, "POST", &uri, Some(&token), None).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(stats(&app, &tid).await["bookmarks"], 1);
        }
        let (_, saved) = call(&app, "GET", "/users/me/bookmarks", Some(&token), None).await;
        assert_eq!(saved[0]["isBookmarked"], true);

        for _ in 0..2 {
            let (status, _) = call(&app, "DELETE", &uri, Some(&token), None).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(stats(&app, &tid).await["bookmarks"], 0);
        }
        let (_, saved) = call(&app, "GET", "/users/me/bookmarks", Some(&token), None).await;
        assert!(saved.as_array().unwrap().is_empty());

        let (status, _) = call(&app, "POST", "/users/me/bookmarks/no-such-tuit", Some(&token), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn listing_is_annotated_for_the_caller() {
        let app = app();
        let (_, alice) = signup(&app, "alice").await;
        let (_, bob) = signup(&app, "bob").await;
        let tid = post_tuit(&app, &alice, "look #here").await;
        call(&app, "PUT", &format!("/users/me/likes/{}", tid), Some(&alice), None).await;
        call(&app, "PUT", &format!("/users/me/bookmarks/{}", tid), Some(&bob), None).await;

        let (_, as_alice) = call(&app, "GET", "/tuits", Some(&alice), None).await;
        assert_eq!(as_alice[0]["isLiked"], true);
        assert_eq!(as_alice[0]["isBookmarked"], false);

        let (_, as_bob) = call(&app, "GET", "/tuits", Some(&bob), None).await;
        assert_eq!(as_bob[0]["isLiked"], false);
        assert_eq!(as_bob[0]["isBookmarked"], true);
        assert_eq!(as_bob[0]["isDisliked"], false);

        let (_, anonymous) = call(&app, "GET", "/tuits", None, None).await;
        assert!(anonymous[0].get("isLiked").is_none());

        let (_, tagged) = call(&app, "GET", "/users/me/bookmarks/tags/here", Some(&bob), None).await;
        assert_eq!(tagged.as_array().unwrap().len(), 1);
        let (_, untagged) = call(&app, "GET", "/users/me/bookmarks/tags/there", Some(&bob), None).await;
        assert!(untagged.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn follow_and_message_round() {
        let app = app();
        let (alice_id, alice) = signup(&app, "alice").await;
        let (bob_id, _) = signup(&app, "bob").await;

        let (status, follow) =
            call(&app, "POST", &format!("/users/me/follows/{}", bob_id), Some(&alice), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(follow["followerId"], alice_id.as_str());

        let (_, followers) = call(&app, "GET", &format!("/users/{}/followers", bob_id), None, None).await;
        assert_eq!(followers.as_array().unwrap().len(), 1);

        let (status, sent) = call(
            &app,
            "POST",
            &format!("/users/me/messages/{}", bob_id),
            Some(&alice),
            Some(json!({ "message": "hi bob" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(sent["sentTo"], bob_id.as_str());

        let (_, inbox) = call(&app, "GET", &format!("/messages/users/{}", bob_id), None, None).await;
        assert_eq!(inbox[0]["message"], "hi bob");

        let (_, removed) =
            call(&app, "DELETE", &format!("/users/me/follows/{}", bob_id), Some(&alice), None).await;
        assert_eq!(removed["deletedCount"], 1);
    }
}
