//! Bearer-token gate integration tests.
//!
//! Tests verify:
//! - Protected routes reject missing, malformed, expired and tampered tokens
//! - A valid token acts for exactly the user it names
//! - Public routes need no token

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};

use microfeed::auth::unix_now;
use microfeed::TokenService;

use super::test_utils::{
    get_request, login, post_tweet, send, signup, test_router, MemoryStore, TEST_SECRET,
};

fn feed_with_authorization(value: &str) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri("/feed")
        .header(header::AUTHORIZATION, value)
        .body(Body::empty())
        .unwrap()
}

// =============================================================================
// Missing or Malformed Credentials
// =============================================================================

#[tokio::test]
async fn test_feed_without_token_rejected() {
    let router = test_router(MemoryStore::new());

    let (status, body) = send(&router, get_request("/feed", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "missing_token");
}

#[tokio::test]
async fn test_tweet_without_token_rejected() {
    let store = MemoryStore::new();
    let router = test_router(store.clone());

    let request = Request::builder()
        .method(Method::POST)
        .uri("/tweets")
        .body(Body::from(r#"{"content":"hello"}"#))
        .unwrap();

    let (status, _) = send(&router, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(store.tweet_count().await, 0);
}

#[tokio::test]
async fn test_non_bearer_scheme_rejected() {
    let router = test_router(MemoryStore::new());

    let (status, body) = send(&router, feed_with_authorization("Basic dXNlcjpwYXNz")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "invalid_scheme");

    let (status, _) = send(&router, feed_with_authorization("Token abc")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_garbage_token_rejected() {
    let router = test_router(MemoryStore::new());

    for value in ["Bearer ", "Bearer garbage", "Bearer a.b.c"] {
        let (status, body) = send(&router, feed_with_authorization(value)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{}", value);
        assert_eq!(body["error"], "invalid_token");
    }
}

// =============================================================================
// Invalid Tokens
// =============================================================================

#[tokio::test]
async fn test_expired_token_rejected() {
    let router = test_router(MemoryStore::new());
    let user_id = signup(&router, "alice", "a@x.com", "pw").await;

    let token = TokenService::new(TEST_SECRET)
        .issue_with_expiry(user_id, unix_now() - 1)
        .unwrap();

    let (status, body) = send(&router, get_request("/feed", Some(&token))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "invalid_token");
}

#[tokio::test]
async fn test_token_from_other_secret_rejected() {
    let router = test_router(MemoryStore::new());
    let user_id = signup(&router, "alice", "a@x.com", "pw").await;

    let token = TokenService::new("some-other-secret").issue(user_id).unwrap();

    let (status, _) = send(&router, get_request("/feed", Some(&token))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_tampered_subject_rejected() {
    let router = test_router(MemoryStore::new());
    signup(&router, "alice", "a@x.com", "pw").await;
    let victim = signup(&router, "bob", "b@x.com", "pw").await;
    let token = login(&router, "a@x.com", "pw").await;

    // Swap in a payload naming bob while keeping alice's signature.
    let forged = TokenService::new("attacker-secret").issue(victim).unwrap();
    let parts: Vec<&str> = token.split('.').collect();
    let forged_parts: Vec<&str> = forged.split('.').collect();
    let spliced = format!("{}.{}.{}", parts[0], forged_parts[1], parts[2]);

    let (status, _) = post_tweet(&router, &spliced, "impersonation").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

// =============================================================================
// Valid Tokens
// =============================================================================

#[tokio::test]
async fn test_token_acts_for_its_subject_only() {
    let router = test_router(MemoryStore::new());
    let alice = signup(&router, "alice", "a@x.com", "pw-a").await;
    let bob = signup(&router, "bob", "b@x.com", "pw-b").await;

    let alice_token = login(&router, "a@x.com", "pw-a").await;
    let bob_token = login(&router, "b@x.com", "pw-b").await;

    post_tweet(&router, &alice_token, "from alice").await;
    post_tweet(&router, &bob_token, "from bob").await;

    let (status, body) = send(&router, get_request("/feed", Some(&alice_token))).await;
    assert_eq!(status, StatusCode::OK);

    for tweet in body.as_array().unwrap() {
        match tweet["content"].as_str().unwrap() {
            "from alice" => {
                assert_eq!(tweet["user_id"], alice);
                assert_eq!(tweet["username"], "alice");
            }
            "from bob" => {
                assert_eq!(tweet["user_id"], bob);
                assert_eq!(tweet["username"], "bob");
            }
            other => panic!("unexpected tweet: {}", other),
        }
    }
}

#[tokio::test]
async fn test_minted_token_within_window_accepted() {
    let router = test_router(MemoryStore::new());
    let user_id = signup(&router, "alice", "a@x.com", "pw").await;

    let token = TokenService::new(TEST_SECRET)
        .issue_with_expiry(user_id, unix_now() + 60)
        .unwrap();

    let (status, _) = post_tweet(&router, &token, "still valid").await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_token_for_deleted_user_cannot_tweet() {
    let store = MemoryStore::new();
    let router = test_router(store.clone());
    let user_id = signup(&router, "alice", "a@x.com", "pw").await;
    let token = login(&router, "a@x.com", "pw").await;

    store.delete_user(user_id).await;

    let (status, _) = post_tweet(&router, &token, "ghost").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(store.tweet_count().await, 0);
}

#[tokio::test]
async fn test_public_routes_ignore_bad_tokens() {
    let router = test_router(MemoryStore::new());

    let request = Request::builder()
        .method(Method::POST)
        .uri("/signup")
        .header(header::AUTHORIZATION, "Bearer not-a-token")
        .body(Body::from(
            r#"{"username":"alice","email":"a@x.com","password":"pw"}"#,
        ))
        .unwrap();

    let (status, _) = send(&router, request).await;
    assert_eq!(status, StatusCode::CREATED);
}
