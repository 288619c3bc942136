//! Integration tests for `SourceClient` using wiremock HTTP mocks.

use chrono::NaiveDate;
use fairscore_core::{DateWindow, Platform};
use fairscore_source::{RetryPolicy, SourceClient, SourceError};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_client(base_url: &str, retry: RetryPolicy) -> SourceClient {
    SourceClient::with_base_url(base_url, Some("test-token"), 30, "fairscore-test", retry)
        .expect("client construction should not fail")
}

fn window() -> DateWindow {
    DateWindow::new(
        NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
        NaiveDate::from_ymd_opt(2025, 1, 15).unwrap(),
    )
    .unwrap()
}

fn bundle_json() -> serde_json::Value {
    serde_json::json!({
        "profile": {
            "username": "glowlab",
            "user_id": "9001",
            "followers": 1500,
            "following": 80,
            "media_count": 320
        },
        "posts": [
            {
                "id": "P1",
                "created_at": "2025-01-15T03:00:00Z",
                "likes": 40,
                "comments": 3,
                "followers": 1490
            }
        ],
        "comments": [
            { "id": "C1", "post_id": "P1", "username": "fan_one", "text": "love it", "reply_count": 1 }
        ],
        "child_comments": [
            { "id": "R1", "comment_id": "C1", "post_id": "P1", "username": "glowlab", "text": "thanks!" }
        ]
    })
}

#[tokio::test]
async fn fetch_engagement_returns_parsed_bundle() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/instagram/accounts/glowlab/engagement"))
        .and(query_param("start", "2025-01-01"))
        .and(query_param("end", "2025-01-15"))
        .and(header("authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(bundle_json()))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server.uri(), RetryPolicy::none());
    let bundle = client
        .fetch_engagement(Platform::Instagram, "glowlab", &window())
        .await
        .expect("should parse bundle");

    assert_eq!(bundle.profile.followers, 1500);
    assert_eq!(bundle.posts.len(), 1);
    assert_eq!(bundle.posts[0].followers, Some(1490));
    assert_eq!(bundle.comments[0].reply_count, 1);
    assert_eq!(bundle.child_comments[0].username, "glowlab");
}

#[tokio::test]
async fn fetch_engagement_maps_404_to_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server.uri(), RetryPolicy::new(2, 0));
    let err = client
        .fetch_engagement(Platform::TikTok, "ghost", &window())
        .await
        .expect_err("404 should fail");

    assert!(
        matches!(err, SourceError::NotFound { ref username, .. } if username == "ghost"),
        "got {err:?}"
    );
}

#[tokio::test]
async fn fetch_engagement_retries_server_errors() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(bundle_json()))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server.uri(), RetryPolicy::new(2, 0));
    let bundle = client
        .fetch_engagement(Platform::Instagram, "glowlab", &window())
        .await
        .expect("third attempt should succeed");
    assert_eq!(bundle.profile.username, "glowlab");
}

#[tokio::test]
async fn fetch_engagement_gives_up_after_policy_is_exhausted() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(502))
        .expect(2)
        .mount(&server)
        .await;

    let client = test_client(&server.uri(), RetryPolicy::new(1, 0));
    let err = client
        .fetch_engagement(Platform::Instagram, "glowlab", &window())
        .await
        .expect_err("should fail after retries");
    assert!(matches!(
        err,
        SourceError::UnexpectedStatus { status: 502, .. }
    ));
}

#[tokio::test]
async fn fetch_engagement_reports_malformed_body() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{\"posts\": 3}"))
        .mount(&server)
        .await;

    let client = test_client(&server.uri(), RetryPolicy::new(2, 0));
    let err = client
        .fetch_engagement(Platform::Instagram, "glowlab", &window())
        .await
        .expect_err("malformed body should fail");
    assert!(matches!(err, SourceError::Deserialize { .. }), "got {err:?}");
}
