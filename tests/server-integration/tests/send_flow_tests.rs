use std::time::Duration;

use reqwest::StatusCode;
use serde_json::{json, Value};
use teamalert_common::message::MessageRecord;
use teamalert_integration::{StubProvider, TestServer};

fn arena_send() -> Value {
    json!({
        "place": "Arena",
        "date": "2025-06-01",
        "time": "20:00",
        "channel": "sms",
        "raw_numbers": "6900000000"
    })
}

/// Failed provider call still yields a landing page that can be acknowledged.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn failed_send_is_logged_and_acknowledgeable() {
    let provider = StubProvider::failing().await;
    let server = TestServer::start(&provider).await;

    let (status, body) = server.post_json("/send", &arena_send()).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["ok"], false);
    assert_eq!(body["error"], "Provider error");
    assert_eq!(body["provider"]["status_code"], 500);
    let id = body["id"].as_str().expect("id returned on provider failure").to_string();
    assert_eq!(body["landing"], format!("{}/r?id={id}", server.base_url));
    assert_eq!(provider.hits(), 1);

    let landing = server.get(&format!("/r?id={id}")).await;
    assert_eq!(landing.status(), StatusCode::OK);
    let html = landing.text().await.unwrap();
    assert!(html.contains("Arena"));
    assert!(html.contains("2025-06-01"));
    assert!(html.contains(&format!("/r?id={id}")));

    let (status, body) = server.post_json("/seen", &json!({ "id": id })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);

    let logs = server.logs().await;
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0]["id"], id.as_str());
    let seen = logs[0]["seen_by"].as_array().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0]["source_address"], "127.0.0.1");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn accepted_send_returns_landing_link() {
    let provider = StubProvider::accepting().await;
    let server = TestServer::start(&provider).await;

    let mut request = arena_send();
    request["raw_numbers"] = json!("6911111111, 06911111111; 306911111111\n+30 692 222 2222");
    let (status, body) = server.post_json("/send", &request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
    assert!(body.get("error").is_none());

    let logs = server.logs().await;
    let record: MessageRecord = serde_json::from_value(logs[0].clone()).unwrap();
    assert_eq!(record.id, body["id"].as_str().unwrap());
    assert_eq!(record.recipients, vec!["306911111111", "306922222222"]);
    assert!(record.text.contains(&record.landing_url));
    assert_eq!(provider.hits(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn sends_are_kept_in_order_with_distinct_ids() {
    let provider = StubProvider::accepting().await;
    let server = TestServer::start(&provider).await;

    let mut ids = Vec::new();
    for place in ["Arena", "Stadium", "Park"] {
        let mut request = arena_send();
        request["place"] = json!(place);
        let (_, body) = server.post_json("/send", &request).await;
        ids.push(body["id"].as_str().unwrap().to_string());
    }

    let logs = server.logs().await;
    let places: Vec<&str> = logs.iter().map(|r| r["place"].as_str().unwrap()).collect();
    assert_eq!(places, vec!["Arena", "Stadium", "Park"]);
    let logged: Vec<&str> = logs.iter().map(|r| r["id"].as_str().unwrap()).collect();
    assert_eq!(logged, ids);
    assert!(ids[0] != ids[1] && ids[1] != ids[2] && ids[0] != ids[2]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn invalid_sends_are_rejected_without_a_record() {
    let provider = StubProvider::accepting().await;
    let server = TestServer::start(&provider).await;

    let mut missing_place = arena_send();
    missing_place["place"] = json!("");
    let mut viber = arena_send();
    viber["channel"] = json!("viber");
    let mut nobody = arena_send();
    nobody["raw_numbers"] = json!(" ; , ");

    for request in [missing_place, viber, nobody] {
        let (status, body) = server.post_json("/send", &request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "request: {request}");
        assert_eq!(body["ok"], false);
        assert!(body["error"].as_str().is_some_and(|e| !e.is_empty()));
        assert!(body.get("id").is_none());
    }

    let resp = server.client.post(server.url("/send")).body("garbage").send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    assert!(server.logs().await.is_empty());
    assert_eq!(provider.hits(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn missing_credential_is_logged_as_failure() {
    let provider = StubProvider::accepting().await;
    let server = TestServer::start_with_key(&provider, None).await;

    let (status, body) = server.post_json("/send", &arena_send()).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["provider"], json!({"error": "Missing YUBOTO_API_KEY env"}));
    assert_eq!(provider.hits(), 0);
    assert_eq!(server.logs().await.len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn unknown_landing_ids_are_not_found() {
    let provider = StubProvider::accepting().await;
    let server = TestServer::start(&provider).await;

    assert_eq!(server.get("/r?id=deadbeef").await.status(), StatusCode::NOT_FOUND);
    assert_eq!(server.get("/r").await.status(), StatusCode::NOT_FOUND);
    assert_eq!(server.get("/r?id=").await.status(), StatusCode::NOT_FOUND);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn seen_for_unknown_id_succeeds_and_changes_nothing() {
    let provider = StubProvider::accepting().await;
    let server = TestServer::start(&provider).await;
    server.post_json("/send", &arena_send()).await;

    let log_path = server.data_dir.path().join("logs.json");
    let before = std::fs::read(&log_path).unwrap();

    let (status, body) = server.post_json("/seen", &json!({ "id": "deadbeef" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
    assert_eq!(std::fs::read(&log_path).unwrap(), before);

    let (status, body) = server.post_json("/seen", &json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"ok": false, "error": "missing id"}));
}

/// A client that gives up mid-send must not leave a delivered SMS unlogged.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn send_abandoned_by_client_is_still_logged() {
    let provider = StubProvider::slow(Duration::from_secs(2)).await;
    let server = TestServer::start(&provider).await;

    let impatient = reqwest::Client::builder()
        .timeout(Duration::from_millis(300))
        .build()
        .unwrap();
    let result = impatient
        .post(server.url("/send"))
        .json(&arena_send())
        .send()
        .await;
    assert!(result.is_err());
    assert_eq!(provider.hits(), 1);

    tokio::time::sleep(Duration::from_secs(3)).await;
    let logs = server.logs().await;
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0]["place"], "Arena");
    assert_eq!(logs[0]["provider_response"]["status_code"], 200);
}
