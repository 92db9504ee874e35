use std::time::Duration;

use serde_json::json;
use tootbridge_core::bridge::Bridge;
use tootbridge_core::client::HttpClient;
use tootbridge_core::text::{TextConfig, TextPreparer};
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn timeline(ids: &[u64]) -> serde_json::Value {
    json!(ids
        .iter()
        .map(|id| json!({
            "full_text": format!("item-{id}"),
            "ext_urlstatus": format!("https://twitter.com/acc/status/{id}"),
            "id_str": id.to_string(),
        }))
        .collect::<Vec<_>>())
}

fn preparer() -> TextPreparer {
    TextPreparer::new(&TextConfig {
        footer_label: "Source:".into(),
        ..TextConfig::default()
    })
}

fn client() -> HttpClient {
    HttpClient::new(Duration::from_secs(1), Duration::from_secs(1)).unwrap()
}

fn bridge(server: &MockServer, watermark: u64) -> Bridge {
    Bridge::new(
        server.uri(),
        "dest-token",
        "acc",
        watermark,
        format!("{}/tw", server.uri()),
    )
}

async fn mount_timeline(server: &MockServer, ids: &[u64]) {
    Mock::given(method("GET"))
        .and(path("/tw/acc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(timeline(ids)))
        .mount(server)
        .await;
}

/// Item ids of the statuses the destination received, in arrival order.
async fn posted_ids(server: &MockServer) -> Vec<u64> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|r| r.url.path() == "/api/v1/statuses")
        .filter_map(|r| {
            let body = String::from_utf8(r.body).ok()?;
            let start = body.find("status=item-")? + "status=item-".len();
            let digits: String = body[start..]
                .chars()
                .take_while(|c| c.is_ascii_digit())
                .collect();
            digits.parse().ok()
        })
        .collect()
}

#[tokio::test]
async fn new_items_are_posted_oldest_first_and_watermark_advances() {
    let server = MockServer::start().await;
    mount_timeline(&server, &[102, 101, 99, 98]).await;
    Mock::given(method("POST"))
        .and(path("/api/v1/statuses"))
        .and(header("authorization", "Bearer dest-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "555" })))
        .expect(2)
        .mount(&server)
        .await;

    let mut b = bridge(&server, 100);
    let report = b.synchronize(&client(), &preparer()).await;

    assert_eq!(report.gathered, 2);
    assert_eq!(report.posted, 2);
    assert_eq!(report.failed, 0);
    assert_eq!(b.watermark(), 102);
    assert_eq!(b.pending_len(), 0);
    assert_eq!(posted_ids(&server).await, vec![101, 102]);
}

#[tokio::test]
async fn item_equal_to_watermark_is_not_relayed() {
    let server = MockServer::start().await;
    mount_timeline(&server, &[100, 99]).await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": 1 })))
        .expect(0)
        .mount(&server)
        .await;

    let mut b = bridge(&server, 100);
    let report = b.synchronize(&client(), &preparer()).await;

    assert_eq!(report.gathered, 0);
    assert_eq!(b.watermark(), 100);
}

#[tokio::test]
async fn failed_post_is_skipped_and_later_item_still_advances_watermark() {
    let server = MockServer::start().await;
    mount_timeline(&server, &[102, 101]).await;
    Mock::given(method("POST"))
        .and(path("/api/v1/statuses"))
        .and(body_string_contains("status=item-101"))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal error"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/statuses"))
        .and(body_string_contains("status=item-102"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "777" })))
        .expect(1)
        .mount(&server)
        .await;

    let mut b = bridge(&server, 100);
    let report = b.synchronize(&client(), &preparer()).await;

    assert_eq!(report.posted, 1);
    assert_eq!(report.failed, 1);
    assert_eq!(b.watermark(), 102);
    assert_eq!(posted_ids(&server).await, vec![101, 102]);
}

#[tokio::test]
async fn failed_item_is_not_retried_on_next_pass() {
    let server = MockServer::start().await;
    mount_timeline(&server, &[102, 101]).await;
    Mock::given(method("POST"))
        .and(body_string_contains("status=item-101"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_string_contains("status=item-102"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "1" })))
        .expect(1)
        .mount(&server)
        .await;

    let mut b = bridge(&server, 100);
    let c = client();
    b.synchronize(&c, &preparer()).await;
    let second = b.synchronize(&c, &preparer()).await;

    assert_eq!(second.gathered, 0);
    assert_eq!(b.watermark(), 102);
}

#[tokio::test]
async fn source_error_gathers_nothing_and_posts_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/tw/acc"))
        .respond_with(ResponseTemplate::new(500).set_body_string("source down"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": 1 })))
        .expect(0)
        .mount(&server)
        .await;

    let mut b = bridge(&server, 100);
    let report = b.synchronize(&client(), &preparer()).await;

    assert_eq!(report.gathered, 0);
    assert_eq!(report.posted, 0);
    assert_eq!(b.watermark(), 100);
}

#[tokio::test]
async fn undecodable_source_payload_gathers_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/tw/acc"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
        .mount(&server)
        .await;

    let mut b = bridge(&server, 100);
    let report = b.synchronize(&client(), &preparer()).await;
    assert_eq!(report.gathered, 0);
    assert_eq!(b.watermark(), 100);
}

#[tokio::test]
async fn posted_text_carries_source_footer() {
    let server = MockServer::start().await;
    mount_timeline(&server, &[201]).await;
    Mock::given(method("POST"))
        .and(body_string_contains(
            "status=item-201%0A%0ASource%3A+https%3A%2F%2Ftwitter.com%2Facc%2Fstatus%2F201",
        ))
        .and(body_string_contains("visibility=unlisted"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "9" })))
        .expect(1)
        .mount(&server)
        .await;

    let mut b = bridge(&server, 200);
    let report = b.synchronize(&client(), &preparer()).await;
    assert_eq!(report.posted, 1);
    assert_eq!(b.watermark(), 201);
}

#[tokio::test]
async fn unreachable_destination_keeps_watermark() {
    let server = MockServer::start().await;
    mount_timeline(&server, &[301]).await;

    // Nothing listens on port 9 locally; the post fails at the transport level.
    let mut b = Bridge::new(
        "http://127.0.0.1:9",
        "dest-token",
        "acc",
        300,
        format!("{}/tw", server.uri()),
    );
    let report = b.synchronize(&client(), &preparer()).await;

    assert_eq!(report.gathered, 1);
    assert_eq!(report.failed, 1);
    assert_eq!(b.watermark(), 300);
    assert_eq!(b.pending_len(), 0);
}
