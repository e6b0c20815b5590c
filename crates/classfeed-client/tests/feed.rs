//! Feed store behavior: wholesale refetch, optimistic like flip with
//! exact rollback, optimistic comment append, deferred reconciliation.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use classfeed_client::{ApiClient, ApiError, FeedStore, MemoryTokenStore, SessionStore};
use classfeed_types::api::Credentials;

const TEST_REFETCH_DELAY: Duration = Duration::from_millis(10);
// Long enough that a deferred refetch never fires inside a test that
// does not want one.
const HELD_REFETCH_DELAY: Duration = Duration::from_secs(60);

async fn signed_in_store(server: &MockServer, refetch_delay: Duration) -> FeedStore {
    Mock::given(method("POST"))
        .and(path("/signin"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "_id": "u1", "email": "u1@kku.ac.th", "firstname": "Ada",
                      "lastname": "Lovelace", "token": "tok-abc" }
        })))
        .mount(server)
        .await;

    let api = ApiClient::new(server.uri(), "test-key", Arc::new(MemoryTokenStore::new()));
    let session = SessionStore::new(api.clone());
    session
        .sign_in(&Credentials {
            email: "u1@kku.ac.th".into(),
            password: "secret".into(),
        })
        .await;
    assert!(session.current().is_authenticated);

    FeedStore::with_refetch_delay(api, session, refetch_delay)
}

fn feed_body(posts: serde_json::Value) -> serde_json::Value {
    json!({ "data": posts })
}

#[tokio::test]
async fn fetch_all_replaces_posts_with_viewer_relative_like_state() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(feed_body(json!([
            {
                "_id": "p1",
                "content": "hello",
                "like": [{ "_id": "u1" }, { "_id": "u2" }],
                "comment": [],
                "createdBy": { "_id": "u2", "email": "u2@kku.ac.th" },
            },
            { "content": "no id, dropped at ingest" },
        ]))))
        .mount(&server)
        .await;

    let feed = signed_in_store(&server, HELD_REFETCH_DELAY).await;
    let posts = feed.fetch_all().await.unwrap();

    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].id, "p1");
    assert!(posts[0].liked_by_me);
    assert_eq!(posts[0].like_count, 2);
    assert!(!posts[0].owned_by("u1"));
    assert_eq!(feed.posts().await, posts);

    // Fetching the same feed again is a no-op on observable state.
    let again = feed.fetch_all().await.unwrap();
    assert_eq!(again, posts);
}

#[tokio::test]
async fn failed_like_rolls_back_to_exact_prior_state() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(feed_body(json!([
            { "_id": "p1", "content": "hi", "like": [{ "_id": "u2" }], "comment": [] },
        ]))))
        .mount(&server)
        .await;
    // Every payload shape is rejected.
    Mock::given(method("POST"))
        .and(path("/like"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({ "message": "nope" })))
        .mount(&server)
        .await;

    let feed = signed_in_store(&server, HELD_REFETCH_DELAY).await;
    feed.fetch_all().await.unwrap();

    let err = feed.toggle_like("p1", false).await.unwrap_err();
    assert!(matches!(err, ApiError::Http { status: 400, .. }));

    let posts = feed.posts().await;
    assert!(!posts[0].liked_by_me);
    assert_eq!(posts[0].like_count, 1);
    assert!(!posts[0].pending_like);
}

#[tokio::test]
async fn successful_like_clears_pending_and_deferred_refetch_supersedes_overlay() {
    let server = MockServer::start().await;
    // First feed fetch: one like, not by the viewer. Later fetches return
    // the authoritative post-mutation state.
    Mock::given(method("GET"))
        .and(path("/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(feed_body(json!([
            { "_id": "p1", "content": "hi", "like": [{ "_id": "u2" }], "comment": [] },
        ]))))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(feed_body(json!([
            {
                "_id": "p1",
                "content": "hi",
                "like": [{ "_id": "u2" }, { "_id": "u1" }, { "_id": "u3" }],
                "comment": [],
            },
        ]))))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/like"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
        .mount(&server)
        .await;

    let feed = signed_in_store(&server, TEST_REFETCH_DELAY).await;
    feed.fetch_all().await.unwrap();

    feed.toggle_like("p1", false).await.unwrap();

    // Immediately after: optimistic overlay confirmed, no longer pending.
    let posts = feed.posts().await;
    assert!(posts[0].liked_by_me);
    assert_eq!(posts[0].like_count, 2);
    assert!(!posts[0].pending_like);

    // After the deferred refetch: the server's count replaces the overlay.
    tokio::time::sleep(TEST_REFETCH_DELAY * 20).await;
    let posts = feed.posts().await;
    assert_eq!(posts[0].like_count, 3);
    assert!(posts[0].liked_by_me);
}

#[tokio::test]
async fn unlike_decrements_optimistically() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(feed_body(json!([
            { "_id": "p1", "content": "hi", "like": [{ "_id": "u1" }], "comment": [] },
        ]))))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/unlike"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
        .mount(&server)
        .await;

    let feed = signed_in_store(&server, HELD_REFETCH_DELAY).await;
    feed.fetch_all().await.unwrap();
    assert!(feed.posts().await[0].liked_by_me);

    feed.toggle_like("p1", true).await.unwrap();

    let posts = feed.posts().await;
    assert!(!posts[0].liked_by_me);
    assert_eq!(posts[0].like_count, 0);
}

#[tokio::test]
async fn add_comment_rejects_empty_input_before_any_request() {
    let server = MockServer::start().await;
    let feed = signed_in_store(&server, HELD_REFETCH_DELAY).await;
    let sign_in_traffic = server.received_requests().await.unwrap().len();

    assert!(feed.add_comment("p1", "   ").await.unwrap_err().is_validation());
    assert!(feed.add_comment("", "hi").await.unwrap_err().is_validation());

    assert_eq!(
        server.received_requests().await.unwrap().len(),
        sign_in_traffic
    );
}

#[tokio::test]
async fn add_comment_appends_locally_with_session_author() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(feed_body(json!([
            { "_id": "p1", "content": "hi", "like": [], "comment": [] },
        ]))))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/comment"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "c9" })))
        .mount(&server)
        .await;

    let feed = signed_in_store(&server, HELD_REFETCH_DELAY).await;
    feed.fetch_all().await.unwrap();

    let comment = feed.add_comment("p1", "  nice post  ").await.unwrap();
    assert_eq!(comment.id, "c9");
    assert_eq!(comment.content, "nice post");
    assert_eq!(comment.author.id, "u1");
    assert_eq!(comment.author.display_name, "Ada Lovelace");

    let posts = feed.posts().await;
    assert_eq!(posts[0].comments.len(), 1);
    assert_eq!(posts[0].comment_count, 1);
    assert_eq!(posts[0].comments[0].id, "c9");
}

#[tokio::test]
async fn add_comment_synthesizes_local_id_when_server_returns_none() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(feed_body(json!([
            { "_id": "p1", "content": "hi", "like": [], "comment": [] },
        ]))))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/comment"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
        .mount(&server)
        .await;

    let feed = signed_in_store(&server, HELD_REFETCH_DELAY).await;
    feed.fetch_all().await.unwrap();

    let comment = feed.add_comment("p1", "hello").await.unwrap();
    assert!(comment.id.starts_with("local-"), "got: {}", comment.id);
}

#[tokio::test]
async fn create_post_refreshes_feed_immediately() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "_id": "p-new" })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(feed_body(json!([
            { "_id": "p-new", "content": "fresh", "like": [], "comment": [] },
        ]))))
        .mount(&server)
        .await;

    let feed = signed_in_store(&server, HELD_REFETCH_DELAY).await;
    feed.create_post("fresh").await.unwrap();

    let posts = feed.posts().await;
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].id, "p-new");
}

#[tokio::test]
async fn delete_comment_reconciles_through_the_deferred_refetch() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/comment/c1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(feed_body(json!([
            { "_id": "p1", "content": "hi", "like": [], "comment": [] },
        ]))))
        .mount(&server)
        .await;

    let feed = signed_in_store(&server, TEST_REFETCH_DELAY).await;
    feed.delete_comment("c1").await.unwrap();

    tokio::time::sleep(TEST_REFETCH_DELAY * 20).await;
    let posts = feed.posts().await;
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].comment_count, 0);
}

#[tokio::test]
async fn delete_post_refetches_even_when_the_delete_fails() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/status/p1"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({ "error": "locked" })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(feed_body(json!([
            { "_id": "p1", "content": "still here", "like": [], "comment": [] },
        ]))))
        .mount(&server)
        .await;

    let feed = signed_in_store(&server, HELD_REFETCH_DELAY).await;

    let err = feed.delete_post("p1").await.unwrap_err();
    assert_eq!(err.status(), Some(500));

    // The refetch ran regardless of the failed delete.
    let posts = feed.posts().await;
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].content, "still here");
}
