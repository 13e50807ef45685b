use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use serde_json::{json, Value};
use teamalert_integration::{StubProvider, TestServer};

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn dedupe_normalizes_raw_text() {
    let provider = StubProvider::accepting().await;
    let server = TestServer::start(&provider).await;

    let (status, body) = server
        .post_json("/api/dedupe", &json!({ "raw": "6912345678, 06912345678; 306912345678" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "numbers": ["306912345678"] }));

    let (_, body) = server.post_json("/api/dedupe", &json!({ "raw": "0030698765432" })).await;
    assert_eq!(body, json!({ "numbers": ["30698765432"] }));

    let resp = server.client.post(server.url("/api/dedupe")).body("{").send().await.unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body, json!({ "numbers": [] }));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn csv_upload_collects_digit_cells() {
    let provider = StubProvider::accepting().await;
    let server = TestServer::start(&provider).await;

    let sheet = "name,phone\nNikos,6911111111\nMaria,0030 692 222 2222\nKostas,06911111111,extra\n";
    let form = Form::new().part(
        "file",
        Part::bytes(sheet.as_bytes().to_vec()).file_name("team.csv"),
    );
    let resp = server
        .client
        .post(server.url("/api/parse_csv"))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body, json!({ "numbers": ["306911111111", "306922222222"] }));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn csv_upload_without_file_part_is_empty() {
    let provider = StubProvider::accepting().await;
    let server = TestServer::start(&provider).await;

    let form = Form::new().text("note", "6911111111");
    let resp = server
        .client
        .post(server.url("/api/parse_csv"))
        .multipart(form)
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body, json!({ "numbers": [] }));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn pages_and_pwa_assets_are_served() {
    let provider = StubProvider::accepting().await;
    let server = TestServer::start(&provider).await;

    let index = server.get("/").await;
    assert_eq!(index.status(), StatusCode::OK);
    assert!(index.text().await.unwrap().contains("FDTeam 2012"));

    let manifest: Value = server.get("/manifest.json").await.json().await.unwrap();
    assert_eq!(manifest["start_url"], "/");

    let sw = server.get("/sw.js").await;
    assert_eq!(sw.headers()["content-type"], "application/javascript");

    let no_redirect = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap();
    let history = no_redirect.get(server.url("/history")).send().await.unwrap();
    assert!(history.status().is_redirection());
    assert_eq!(history.headers()["location"], "/");

    let health: Value = server.get("/health").await.json().await.unwrap();
    assert_eq!(health, json!({ "status": "ok", "records": 0 }));
}
