//! End-to-end tests for the auth endpoints and role gate
//!
//! Drives the full router with in-memory stores.

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use inpawdia_server::auth::{AuthService, TokenService};
use inpawdia_server::config::Environment;
use inpawdia_server::middleware::RateLimiter;
use inpawdia_server::models::UserRole;
use inpawdia_server::routes::build_router;
use inpawdia_server::state::AppState;
use inpawdia_server::store::{MemoryCredentialStore, MemoryPetStore};

struct TestApp {
    router: Router,
    auth: Arc<AuthService>,
}

fn test_app() -> TestApp {
    let tokens = TokenService::new(
        "test-access-secret",
        "test-refresh-secret",
        chrono::Duration::minutes(15),
        chrono::Duration::days(7),
    );
    let auth = Arc::new(AuthService::new(
        Arc::new(MemoryCredentialStore::new()),
        tokens,
        4,
    ));
    let state = AppState::new(
        auth.clone(),
        Arc::new(MemoryPetStore::new()),
        Environment::Development,
    );

    TestApp {
        router: build_router(state, RateLimiter::new(10_000)),
        auth,
    }
}

impl TestApp {
    async fn send(
        &self,
        method: &str,
        uri: &str,
        bearer: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = bearer {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    async fn register(&self, email: &str, password: &str) -> (StatusCode, Value) {
        self.send(
            "POST",
            "/api/auth/register",
            None,
            Some(json!({ "email": email, "password": password })),
        )
        .await
    }

    async fn login(&self, email: &str, password: &str) -> (StatusCode, Value) {
        self.send(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "email": email, "password": password })),
        )
        .await
    }

    async fn refresh(&self, refresh_token: &str) -> (StatusCode, Value) {
        self.send(
            "POST",
            "/api/auth/refresh",
            None,
            Some(json!({ "refreshToken": refresh_token })),
        )
        .await
    }
}

fn token<'a>(body: &'a Value, field: &str) -> &'a str {
    body[field].as_str().unwrap()
}

#[tokio::test]
async fn register_returns_viewer_and_distinct_tokens() {
    let app = test_app();

    let (status, body) = app.register("a@x.com", "secret1").await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    assert_eq!(body["user"]["email"], "a@x.com");
    assert_eq!(body["user"]["role"], "viewer");
    assert!(body["user"].get("password").is_none());
    assert!(body["user"].get("passwordHash").is_none());
    assert_ne!(token(&body, "accessToken"), token(&body, "refreshToken"));
}

#[tokio::test]
async fn register_rejects_invalid_input_and_duplicates() {
    let app = test_app();

    let (status, body) = app.register("a@x.com", "12345").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Password must be at least 6 characters long");

    let (status, _) = app.register("not-an-email", "secret1").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.register("a@x.com", "secret1").await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app.register("A@X.com", "another1").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "User with this email already exists");
}

#[tokio::test]
async fn malformed_json_is_a_bad_request() {
    let app = test_app();

    let request = Request::builder()
        .method("POST")
        .uri("/api/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn login_failures_are_indistinguishable() {
    let app = test_app();
    app.register("a@x.com", "secret1").await;

    let (status, wrong_password) = app.login("a@x.com", "wrong-password").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, unknown_user) = app.login("nobody@x.com", "secret1").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    assert_eq!(wrong_password["error"], unknown_user["error"]);
    assert_eq!(wrong_password["error"], "Invalid email or password");

    let (status, body) = app.login("a@x.com", "").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Password is required");
}

#[tokio::test]
async fn sessions_from_separate_logins_coexist() {
    let app = test_app();
    let (_, first) = app.register("a@x.com", "secret1").await;
    let (status, second) = app.login("a@x.com", "secret1").await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.refresh(token(&first, "refreshToken")).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.refresh(token(&second, "refreshToken")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn refresh_rotates_and_rejects_replay() {
    let app = test_app();
    let (_, registered) = app.register("a@x.com", "secret1").await;
    let original = token(&registered, "refreshToken").to_string();

    let (status, rotated) = app.refresh(&original).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(rotated["success"], true);
    assert_ne!(token(&rotated, "refreshToken"), original);

    let (status, body) = app.refresh(&original).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);

    let (status, _) = app.refresh(token(&rotated, "refreshToken")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn refresh_requires_a_token() {
    let app = test_app();

    let (status, _) = app
        .send("POST", "/api/auth/refresh", None, Some(json!({})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.refresh("").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.refresh("garbage").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn access_token_is_not_a_refresh_token() {
    let app = test_app();
    let (_, registered) = app.register("a@x.com", "secret1").await;

    let (status, _) = app.refresh(token(&registered, "accessToken")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .send(
            "GET",
            "/api/auth/me",
            Some(token(&registered, "refreshToken")),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn me_requires_token_and_existing_user() {
    let app = test_app();

    let (status, body) = app.send("GET", "/api/auth/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "No token provided");

    let (status, body) = app
        .send("GET", "/api/auth/me", Some("not-a-jwt"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid or expired token");

    let (_, registered) = app.register("a@x.com", "secret1").await;
    let access = token(&registered, "accessToken").to_string();

    let (status, body) = app.send("GET", "/api/auth/me", Some(&access), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["email"], "a@x.com");
    assert_eq!(body["user"]["role"], "viewer");

    let user_id = body["user"]["id"].as_str().unwrap().parse().unwrap();
    app.auth.delete_user(user_id).await.unwrap();

    // Access token still verifies, but the account is gone
    let (status, _) = app.send("GET", "/api/auth/me", Some(&access), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.refresh(token(&registered, "refreshToken")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn logout_revokes_and_is_idempotent() {
    let app = test_app();
    let (_, registered) = app.register("a@x.com", "secret1").await;
    let refresh = token(&registered, "refreshToken").to_string();

    for _ in 0..2 {
        let (status, body) = app
            .send(
                "POST",
                "/api/auth/logout",
                None,
                Some(json!({ "refreshToken": refresh })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["message"], "Logged out successfully");
    }

    let (status, _) = app.refresh(&refresh).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .send(
            "POST",
            "/api/auth/logout",
            None,
            Some(json!({ "refreshToken": "garbage" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.send("POST", "/api/auth/logout", None, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn logout_all_revokes_every_session() {
    let app = test_app();
    let (_, first) = app.register("a@x.com", "secret1").await;
    let (_, second) = app.login("a@x.com", "secret1").await;

    let (status, body) = app
        .send(
            "POST",
            "/api/auth/logout-all",
            Some(token(&second, "accessToken")),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["revokedSessions"], 2);

    let (status, _) = app.refresh(token(&first, "refreshToken")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = app.refresh(token(&second, "refreshToken")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn role_gate_protects_catalog_writes() {
    let app = test_app();
    let pet = json!({ "name": "Beagle", "type": "dog", "origin": "England" });

    let (status, _) = app.send("POST", "/api/pets", None, Some(pet.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (_, registered) = app.register("e@x.com", "secret1").await;
    let viewer_access = token(&registered, "accessToken").to_string();

    let (status, body) = app
        .send("POST", "/api/pets", Some(&viewer_access), Some(pet.clone()))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Insufficient permissions");

    // Promotion takes effect once a refreshed access token is issued
    let user_id = registered["user"]["id"].as_str().unwrap().parse().unwrap();
    app.auth.set_role(user_id, UserRole::Editor).await.unwrap();
    let (_, refreshed) = app.refresh(token(&registered, "refreshToken")).await;
    let editor_access = token(&refreshed, "accessToken").to_string();

    let (status, created) = app
        .send("POST", "/api/pets", Some(&editor_access), Some(pet))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["data"]["name"], "Beagle");
    let pet_uri = format!("/api/pets/{}", created["data"]["id"].as_str().unwrap());

    let renamed = json!({ "name": "Pocket Beagle", "type": "dog", "origin": "England" });
    let (status, body) = app
        .send("PUT", &pet_uri, Some(&viewer_access), Some(renamed.clone()))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Insufficient permissions");

    let (status, updated) = app
        .send("PUT", &pet_uri, Some(&editor_access), Some(renamed))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["data"]["name"], "Pocket Beagle");

    let (status, listed) = app.send("GET", "/api/pets", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed["count"], 1);

    let (status, _) = app
        .send("DELETE", &pet_uri, Some(&editor_access), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    app.auth.set_role(user_id, UserRole::Admin).await.unwrap();
    let (_, refreshed) = app.refresh(token(&refreshed, "refreshToken")).await;
    let admin_access = token(&refreshed, "accessToken").to_string();

    let (status, _) = app.send("DELETE", &pet_uri, Some(&admin_access), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.send("GET", &pet_uri, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Pet not found");
}

#[tokio::test]
async fn admin_manages_user_roles() {
    let app = test_app();
    let (_, admin) = app.register("admin@x.com", "secret1").await;
    let (_, viewer) = app.register("v@x.com", "secret1").await;

    let admin_id = admin["user"]["id"].as_str().unwrap().parse().unwrap();
    app.auth.set_role(admin_id, UserRole::Admin).await.unwrap();
    let (_, admin) = app.login("admin@x.com", "secret1").await;
    let admin_access = token(&admin, "accessToken").to_string();

    let viewer_id = viewer["user"]["id"].as_str().unwrap().to_string();
    let role_uri = format!("/api/users/{}/role", viewer_id);

    let (status, _) = app
        .send(
            "PUT",
            &role_uri,
            Some(token(&viewer, "accessToken")),
            Some(json!({ "role": "admin" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .send(
            "PUT",
            &role_uri,
            Some(&admin_access),
            Some(json!({ "role": "editor" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["role"], "editor");

    let (status, _) = app
        .send(
            "DELETE",
            &format!("/api/users/{}", viewer_id),
            Some(&admin_access),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.login("v@x.com", "secret1").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn admin_cannot_delete_own_account() {
    let app = test_app();
    let (_, admin) = app.register("admin@x.com", "secret1").await;
    let admin_id = admin["user"]["id"].as_str().unwrap().to_string();
    app.auth
        .set_role(admin_id.parse().unwrap(), UserRole::Admin)
        .await
        .unwrap();
    let (_, admin) = app.login("admin@x.com", "secret1").await;

    let (status, body) = app
        .send(
            "DELETE",
            &format!("/api/users/{}", admin_id),
            Some(token(&admin, "accessToken")),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Admins cannot delete their own account");

    // The account is untouched
    let (status, _) = app.login("admin@x.com", "secret1").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn health_and_security_headers() {
    let app = test_app();

    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::X_CONTENT_TYPE_OPTIONS],
        "nosniff"
    );
    assert_eq!(response.headers()[header::X_FRAME_OPTIONS], "DENY");

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["environment"], "development");

    let (status, body) = app.send("GET", "/api/nowhere", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}
