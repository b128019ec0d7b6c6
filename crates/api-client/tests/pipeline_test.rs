//! Integration tests for the session-aware request pipeline
//!
//! Every test runs the real client against a local mock server, exercising
//! bearer injection, the single-flight refresh, and the one-retry bound.

use foodshare_api_client::{ApiError, ClientConfig, FoodshareClient, RequestPolicy};
use foodshare_auth::{AuthError, AuthEventBus, AuthEventKind, Subscription, TokenStore};
use mockito::{Matcher, Server, ServerGuard};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

const REFRESH_OK: &str = r#"{
    "success": true,
    "message": "Token refreshed",
    "data": { "accessToken": "T2", "refreshToken": "R2" },
    "timestamp": "2025-06-01T12:00:00Z"
}"#;

const REFRESH_OK_NO_ROTATION: &str = r#"{
    "success": true,
    "message": "Token refreshed",
    "data": { "accessToken": "T2" },
    "timestamp": "2025-06-01T12:00:00Z"
}"#;

const REFRESH_REVOKED: &str = r#"{
    "success": false,
    "message": "Refresh token revoked",
    "data": null,
    "timestamp": "2025-06-01T12:00:00Z"
}"#;

fn pipeline_client(
    server: &ServerGuard,
    tokens: &TokenStore,
    events: &AuthEventBus,
) -> FoodshareClient {
    let config = ClientConfig::default()
        .with_base_url(server.url())
        .with_timeout(Duration::from_secs(5))
        .with_refresh_timeout(Duration::from_secs(5));
    FoodshareClient::with_parts(config, tokens.clone(), events.clone())
        .expect("client should build against the mock server")
}

fn count_events(bus: &AuthEventBus, kind: AuthEventKind) -> (Subscription, Arc<AtomicUsize>) {
    let count = Arc::new(AtomicUsize::new(0));
    let count2 = Arc::clone(&count);
    let sub = bus.subscribe(kind, move |_| {
        count2.fetch_add(1, Ordering::SeqCst);
    });
    (sub, count)
}

#[tokio::test]
async fn concurrent_401s_share_a_single_refresh() {
    let mut server = Server::new_async().await;

    let stale = server
        .mock("GET", "/profile")
        .match_header("authorization", "Bearer T1")
        .with_status(401)
        .expect(3)
        .create_async()
        .await;
    let refresh = server
        .mock("POST", "/auth/refresh")
        .match_body(Matcher::Json(serde_json::json!({ "refreshToken": "R1" })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(REFRESH_OK)
        .expect(1)
        .create_async()
        .await;
    let retried = server
        .mock("GET", "/profile")
        .match_header("authorization", "Bearer T2")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{ "id": "u1" }"#)
        .expect(3)
        .create_async()
        .await;

    let tokens = TokenStore::in_memory();
    tokens.set_tokens("T1", "R1").await;
    let events = AuthEventBus::new();
    let client = pipeline_client(&server, &tokens, &events);

    let (a, b, c) = tokio::join!(
        client.get::<serde_json::Value>("profile", RequestPolicy::authorized()),
        client.get::<serde_json::Value>("profile", RequestPolicy::authorized()),
        client.get::<serde_json::Value>("profile", RequestPolicy::authorized()),
    );

    assert_eq!(a.unwrap()["id"], "u1");
    assert_eq!(b.unwrap()["id"], "u1");
    assert_eq!(c.unwrap()["id"], "u1");
    stale.assert_async().await;
    refresh.assert_async().await;
    retried.assert_async().await;
    assert_eq!(tokens.access_token().await.as_deref(), Some("T2"));
    assert_eq!(tokens.refresh_token().await.as_deref(), Some("R2"));
}

#[tokio::test]
async fn expired_token_is_refreshed_and_the_request_retried_once() {
    let mut server = Server::new_async().await;

    let stale = server
        .mock("GET", "/profile")
        .match_header("authorization", "Bearer T1")
        .with_status(401)
        .expect(1)
        .create_async()
        .await;
    let refresh = server
        .mock("POST", "/auth/refresh")
        .match_body(Matcher::Json(serde_json::json!({ "refreshToken": "R1" })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(REFRESH_OK)
        .expect(1)
        .create_async()
        .await;
    let retried = server
        .mock("GET", "/profile")
        .match_header("authorization", "Bearer T2")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{ "id": "u1" }"#)
        .expect(1)
        .create_async()
        .await;

    let tokens = TokenStore::in_memory();
    tokens.set_tokens("T1", "R1").await;
    let events = AuthEventBus::new();
    let client = pipeline_client(&server, &tokens, &events);

    let profile: serde_json::Value = client
        .get("profile", RequestPolicy::authorized())
        .await
        .expect("retry with the refreshed token should succeed");

    assert_eq!(profile["id"], "u1");
    stale.assert_async().await;
    refresh.assert_async().await;
    retried.assert_async().await;
}

#[tokio::test]
async fn rejected_refresh_fails_the_request_and_clears_the_session() {
    let mut server = Server::new_async().await;

    let stale = server
        .mock("GET", "/profile")
        .match_header("authorization", "Bearer T1")
        .with_status(401)
        .expect(1)
        .create_async()
        .await;
    let refresh = server
        .mock("POST", "/auth/refresh")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(REFRESH_REVOKED)
        .expect(1)
        .create_async()
        .await;

    let tokens = TokenStore::in_memory();
    tokens.set_tokens("T1", "R1").await;
    let events = AuthEventBus::new();
    let (_sub, failures) = count_events(&events, AuthEventKind::TokenRefreshFailed);
    let client = pipeline_client(&server, &tokens, &events);

    let result: Result<serde_json::Value, _> =
        client.get("profile", RequestPolicy::authorized()).await;

    match result {
        Err(ApiError::Auth(AuthError::Rejected { message })) => {
            assert_eq!(message, "Refresh token revoked");
        }
        other => panic!("expected a rejected refresh, got {other:?}"),
    }
    stale.assert_async().await;
    refresh.assert_async().await;
    assert_eq!(failures.load(Ordering::SeqCst), 1);
    assert_eq!(tokens.access_token().await, None);
    assert_eq!(tokens.refresh_token().await, None);
}

#[tokio::test]
async fn missing_refresh_token_fails_without_calling_the_endpoint() {
    let mut server = Server::new_async().await;

    let stale = server
        .mock("GET", "/profile")
        .match_header("authorization", "Bearer T1")
        .with_status(401)
        .expect(1)
        .create_async()
        .await;
    let refresh = server
        .mock("POST", "/auth/refresh")
        .expect(0)
        .create_async()
        .await;

    let tokens = TokenStore::in_memory();
    tokens.set_access_token("T1").await;
    let events = AuthEventBus::new();
    let (_sub, logouts) = count_events(&events, AuthEventKind::Logout);
    let client = pipeline_client(&server, &tokens, &events);

    let result: Result<serde_json::Value, _> =
        client.get("profile", RequestPolicy::authorized()).await;

    assert!(matches!(
        result,
        Err(ApiError::Auth(AuthError::NoRefreshToken))
    ));
    stale.assert_async().await;
    refresh.assert_async().await;
    assert_eq!(logouts.load(Ordering::SeqCst), 1);
    assert_eq!(tokens.access_token().await, None);
}

#[tokio::test]
async fn second_401_after_refresh_is_terminal_for_the_request() {
    let mut server = Server::new_async().await;

    let stale = server
        .mock("GET", "/profile")
        .match_header("authorization", "Bearer T1")
        .with_status(401)
        .expect(1)
        .create_async()
        .await;
    let refresh = server
        .mock("POST", "/auth/refresh")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(REFRESH_OK_NO_ROTATION)
        .expect(1)
        .create_async()
        .await;
    let still_stale = server
        .mock("GET", "/profile")
        .match_header("authorization", "Bearer T2")
        .with_status(401)
        .with_body("insufficient permissions")
        .expect(1)
        .create_async()
        .await;

    let tokens = TokenStore::in_memory();
    tokens.set_tokens("T1", "R1").await;
    let events = AuthEventBus::new();
    let (_sub_a, failures) = count_events(&events, AuthEventKind::TokenRefreshFailed);
    let (_sub_b, logouts) = count_events(&events, AuthEventKind::Logout);
    let client = pipeline_client(&server, &tokens, &events);

    let result: Result<serde_json::Value, _> =
        client.get("profile", RequestPolicy::authorized()).await;

    match result {
        Err(ApiError::RetryExhausted { message }) => {
            assert_eq!(message, "insufficient permissions");
        }
        other => panic!("expected retry exhaustion, got {other:?}"),
    }
    stale.assert_async().await;
    refresh.assert_async().await;
    still_stale.assert_async().await;
    // A per-request failure, not a session-wide one: nothing cleared,
    // nothing emitted, and the refreshed pair survives.
    assert_eq!(failures.load(Ordering::SeqCst), 0);
    assert_eq!(logouts.load(Ordering::SeqCst), 0);
    assert_eq!(tokens.access_token().await.as_deref(), Some("T2"));
    assert_eq!(tokens.refresh_token().await.as_deref(), Some("R1"));
}

#[tokio::test]
async fn public_401_emits_unauthorized_instead_of_refreshing() {
    let mut server = Server::new_async().await;

    let rejected = server
        .mock("GET", "/health")
        .match_header("authorization", Matcher::Missing)
        .with_status(401)
        .with_body("anonymous access disabled")
        .expect(1)
        .create_async()
        .await;
    let refresh = server
        .mock("POST", "/auth/refresh")
        .expect(0)
        .create_async()
        .await;

    let tokens = TokenStore::in_memory();
    tokens.set_tokens("T1", "R1").await;
    let events = AuthEventBus::new();
    let (_sub, unauthorized) = count_events(&events, AuthEventKind::Unauthorized);
    let client = pipeline_client(&server, &tokens, &events);

    let result = client.health().check().await;

    match result {
        Err(ApiError::ApiResponse { status, .. }) => assert_eq!(status, 401),
        other => panic!("expected a passthrough 401, got {other:?}"),
    }
    rejected.assert_async().await;
    refresh.assert_async().await;
    assert_eq!(unauthorized.load(Ordering::SeqCst), 1);
    // The stored pair is untouched by a public-endpoint rejection.
    assert_eq!(tokens.access_token().await.as_deref(), Some("T1"));
}

#[tokio::test]
async fn health_check_is_anonymous_and_correlated() {
    let mut server = Server::new_async().await;

    let health = server
        .mock("GET", "/health")
        .match_header("authorization", Matcher::Missing)
        .match_header("x-request-id", Matcher::Regex("[0-9a-f-]{36}".to_string()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{ "status": "ok", "version": "1.4.2" }"#)
        .expect(1)
        .create_async()
        .await;

    let tokens = TokenStore::in_memory();
    tokens.set_tokens("T1", "R1").await;
    let events = AuthEventBus::new();
    let client = pipeline_client(&server, &tokens, &events);

    let response = client.health().check().await.expect("health should be ok");

    assert_eq!(response.status, "ok");
    health.assert_async().await;
}

#[tokio::test]
async fn sign_in_persists_the_issued_pair() {
    let mut server = Server::new_async().await;

    let login = server
        .mock("POST", "/auth/login")
        .match_header("authorization", Matcher::Missing)
        .match_body(Matcher::Json(serde_json::json!({
            "email": "user@example.com",
            "password": "hunter2"
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{
                "success": true,
                "message": "Welcome back",
                "data": {
                    "accessToken": "T1",
                    "refreshToken": "R1",
                    "user": { "id": "u1", "email": "user@example.com" }
                }
            }"#,
        )
        .expect(1)
        .create_async()
        .await;

    let tokens = TokenStore::in_memory();
    let events = AuthEventBus::new();
    let client = pipeline_client(&server, &tokens, &events);

    let session = client
        .session()
        .sign_in("user@example.com", "hunter2")
        .await
        .expect("sign in should succeed");

    assert_eq!(session.user.id, "u1");
    login.assert_async().await;
    assert_eq!(tokens.access_token().await.as_deref(), Some("T1"));
    assert_eq!(tokens.refresh_token().await.as_deref(), Some("R1"));
}

#[tokio::test]
async fn rejected_sign_in_surfaces_the_server_message() {
    let mut server = Server::new_async().await;

    let login = server
        .mock("POST", "/auth/login")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{
                "success": false,
                "message": "Invalid credentials",
                "data": null
            }"#,
        )
        .expect(1)
        .create_async()
        .await;

    let tokens = TokenStore::in_memory();
    let events = AuthEventBus::new();
    let client = pipeline_client(&server, &tokens, &events);

    let result = client.session().sign_in("user@example.com", "wrong").await;

    match result {
        Err(ApiError::Rejected { message }) => assert_eq!(message, "Invalid credentials"),
        other => panic!("expected an envelope rejection, got {other:?}"),
    }
    login.assert_async().await;
    // A rejected sign-in never touches the store.
    assert_eq!(tokens.access_token().await, None);
    assert_eq!(tokens.refresh_token().await, None);
}

#[tokio::test]
async fn sign_out_clears_locally_even_when_revocation_fails() {
    let mut server = Server::new_async().await;

    let logout = server
        .mock("POST", "/auth/logout")
        .match_header("authorization", "Bearer T1")
        .with_status(500)
        .with_body("revocation store down")
        .expect(1)
        .create_async()
        .await;

    let tokens = TokenStore::in_memory();
    tokens.set_tokens("T1", "R1").await;
    let events = AuthEventBus::new();
    let (_sub, logouts) = count_events(&events, AuthEventKind::Logout);
    let client = pipeline_client(&server, &tokens, &events);

    let result = client.session().sign_out().await;

    assert!(matches!(
        result,
        Err(ApiError::ApiResponse { status: 500, .. })
    ));
    logout.assert_async().await;
    assert_eq!(logouts.load(Ordering::SeqCst), 1);
    assert_eq!(tokens.access_token().await, None);
    assert_eq!(tokens.refresh_token().await, None);
}

#[tokio::test]
async fn sign_out_happy_path() {
    let mut server = Server::new_async().await;

    let logout = server
        .mock("POST", "/auth/logout")
        .match_header("authorization", "Bearer T1")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{ "success": true }"#)
        .expect(1)
        .create_async()
        .await;

    let tokens = TokenStore::in_memory();
    tokens.set_tokens("T1", "R1").await;
    let events = AuthEventBus::new();
    let (_sub, logouts) = count_events(&events, AuthEventKind::Logout);
    let client = pipeline_client(&server, &tokens, &events);

    client.session().sign_out().await.expect("sign out");

    logout.assert_async().await;
    assert_eq!(logouts.load(Ordering::SeqCst), 1);
    assert_eq!(tokens.refresh_token().await, None);
}

#[tokio::test]
async fn force_refresh_joins_the_same_machinery() {
    let mut server = Server::new_async().await;

    let refresh = server
        .mock("POST", "/auth/refresh")
        .match_body(Matcher::Json(serde_json::json!({ "refreshToken": "R1" })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(REFRESH_OK)
        .expect(1)
        .create_async()
        .await;

    let tokens = TokenStore::in_memory();
    tokens.set_tokens("T1", "R1").await;
    let events = AuthEventBus::new();
    let client = pipeline_client(&server, &tokens, &events);

    let token = client
        .session()
        .force_refresh()
        .await
        .expect("refresh should succeed");

    assert_eq!(token, "T2");
    refresh.assert_async().await;
    assert_eq!(tokens.access_token().await.as_deref(), Some("T2"));
}
