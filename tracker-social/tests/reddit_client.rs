mod common;

use std::sync::Arc;

use futures::TryStreamExt;
use serde_json::{Value, json};
use tracker_config::{CollectorConfig, RedditConfig};
use tracker_social::reddit::types::Identity;
use tracker_social::reddit::{ApiError, RedditApi, RedditClient};
use tracker_social::{CollectError, Collector, NoDelay, TracingObserver};
use wiremock::matchers::{
    basic_auth, body_string, header, method, path, query_param, query_param_is_missing,
};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config(server: &MockServer) -> RedditConfig {
    let mut cfg = RedditConfig::new("client-id", "client-secret").with_base_url(server.uri());
    cfg.user_agent = "tracker-tests/0.1".into();
    cfg.max_retries = 0;
    cfg
}

async fn mount_token(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/api/v1/access_token"))
        .and(basic_auth("client-id", "client-secret"))
        .and(header("user-agent", "tracker-tests/0.1"))
        .and(body_string("grant_type=client_credentials"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "tok",
            "token_type": "bearer",
            "expires_in": 86400,
            "scope": "*"
        })))
        .mount(server)
        .await;
}

async fn client(server: &MockServer) -> RedditClient {
    mount_token(server).await;
    RedditClient::authenticate(&config(server))
        .await
        .expect("token grant")
}

fn listing(children: Vec<Value>, after: Option<&str>) -> Value {
    json!({ "kind": "Listing", "data": { "after": after, "children": children } })
}

fn post(id: &str) -> Value {
    json!({ "kind": "t3", "data": {
        "id": id, "title": format!("Post {id}"), "selftext": "", "author": "alice",
        "subreddit": "rust", "score": 5, "upvote_ratio": 0.8, "num_comments": 1,
        "created_utc": 1700000000.0, "url": format!("https://x/{id}"), "is_self": true
    } })
}

fn comment(id: &str, parent: &str) -> Value {
    json!({ "kind": "t1", "data": {
        "id": id, "name": format!("t1_{id}"), "body": format!("body {id}"), "author": "bob",
        "subreddit": "rust", "score": 2, "created_utc": 1700000100.0,
        "parent_id": parent, "link_id": "t3_p1", "is_submitter": false, "replies": ""
    } })
}

#[tokio::test]
async fn connect_accepts_application_only_token() {
    common::init_test_tracing();
    let server = MockServer::start().await;
    mount_token(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/v1/me"))
        .and(header("authorization", "Bearer tok"))
        .and(query_param("raw_json", "1"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "message": "Forbidden", "error": 403
        })))
        .expect(1)
        .mount(&server)
        .await;

    let collector = Collector::connect(&config(&server), &CollectorConfig { item_delay_ms: 0 })
        .await
        .expect("application token is enough");

    assert_eq!(collector.identity(), &Identity::application());
}

#[tokio::test]
async fn rejected_credentials_fail_to_connect() {
    common::init_test_tracing();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/access_token"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "message": "Unauthorized", "error": 401
        })))
        .mount(&server)
        .await;

    let result = Collector::connect(&config(&server), &CollectorConfig::default()).await;

    assert!(matches!(result, Err(CollectError::Connect(ApiError::Auth(_)))));
}

#[tokio::test]
async fn token_error_body_is_an_auth_failure() {
    common::init_test_tracing();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/access_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "error": "invalid_grant" })))
        .mount(&server)
        .await;

    let err = RedditClient::authenticate(&config(&server))
        .await
        .err()
        .expect("no token");
    assert!(matches!(err, ApiError::Auth(ref msg) if msg == "invalid_grant"));
}

#[tokio::test]
async fn top_listing_follows_the_after_cursor() {
    common::init_test_tracing();
    let server = MockServer::start().await;
    let api = client(&server).await;
    Mock::given(method("GET"))
        .and(path("/r/rust/top"))
        .and(query_param("t", "day"))
        .and(query_param("limit", "10"))
        .and(query_param_is_missing("after"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(listing(vec![post("a"), post("b")], Some("t3_b"))),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/r/rust/top"))
        .and(query_param("after", "t3_b"))
        .and(query_param("limit", "8"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing(vec![post("c")], None)))
        .expect(1)
        .mount(&server)
        .await;

    let posts: Vec<_> = api.top("rust", "day", 10).try_collect().await.expect("pages");

    let ids: Vec<_> = posts.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, ["a", "b", "c"]);
}

#[tokio::test]
async fn listing_stops_at_limit_without_another_page() {
    common::init_test_tracing();
    let server = MockServer::start().await;
    let api = client(&server).await;
    Mock::given(method("GET"))
        .and(path("/r/all/search"))
        .and(query_param("q", "borrow checker"))
        .and(query_param("restrict_sr", "1"))
        .and(query_param("sort", "relevance"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(listing(vec![post("a"), post("b")], Some("t3_b"))),
        )
        .expect(1)
        .mount(&server)
        .await;

    let posts: Vec<_> = api
        .search("all", "borrow checker", "week", 2)
        .try_collect()
        .await
        .expect("one page");

    assert_eq!(posts.len(), 2);
}

#[tokio::test]
async fn comments_load_more_children() {
    common::init_test_tracing();
    let server = MockServer::start().await;
    mount_token(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/v1/me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "name": "bot", "id": "u1" })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/comments/p1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            listing(vec![post("p1")], None),
            listing(
                vec![
                    comment("a", "t3_p1"),
                    json!({ "kind": "more", "data": {
                        "id": "m1", "count": 2, "parent_id": "t3_p1", "depth": 0,
                        "children": ["b", "c"]
                    } }),
                ],
                None,
            ),
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/morechildren"))
        .and(query_param("api_type", "json"))
        .and(query_param("link_id", "t3_p1"))
        .and(query_param("children", "b,c"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "json": { "errors": [], "data": { "things": [comment("b", "t3_p1"), comment("c", "t3_p1")] } }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let api = RedditClient::authenticate(&config(&server)).await.expect("token");
    let collector = Collector::with_api(Arc::new(api), Arc::new(NoDelay), Arc::new(TracingObserver))
        .await
        .expect("identity");

    let comments = collector.fetch_comments("p1", 10).await;

    let ids: Vec<_> = comments.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, ["a", "b", "c"]);
    assert!(comments.iter().all(|c| c.post_id == "p1" && c.parent_id == "t3_p1"));
    assert_eq!(collector.identity().display_name(), "bot");
}

#[tokio::test]
async fn morechildren_errors_fail_the_fetch() {
    common::init_test_tracing();
    let server = MockServer::start().await;
    mount_token(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/v1/me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "name": "bot" })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/comments/p1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            listing(vec![post("p1")], None),
            listing(
                vec![json!({ "kind": "more", "data": {
                    "id": "m1", "count": 1, "parent_id": "t3_p1", "children": ["b"]
                } })],
                None,
            ),
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/morechildren"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "json": { "errors": [["RATELIMIT", "slow down", "ratelimit"]] }
        })))
        .mount(&server)
        .await;

    let api = RedditClient::authenticate(&config(&server)).await.expect("token");
    let collector = Collector::with_api(Arc::new(api), Arc::new(NoDelay), Arc::new(TracingObserver))
        .await
        .expect("identity");

    let err = collector.try_fetch_comments("p1", 10).await.unwrap_err();
    assert!(matches!(
        err,
        CollectError::Remote {
            source: ApiError::Remote(_),
            ..
        }
    ));
    assert!(collector.fetch_comments("p1", 10).await.is_empty());
}
