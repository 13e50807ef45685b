//! HTTP surface.
//!
//! JSON bodies are parsed leniently: a missing or malformed body behaves like
//! an empty object, and the operation then validates what it got.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::QueryRejection;
use axum::extract::{ConnectInfo, Multipart, Query, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use teamalert_common::csv_import::extract_numbers;
use teamalert_common::message::{MessageRecord, ProviderResponse};
use teamalert_common::msisdn::normalize_msisdns;
use tokio::net::TcpListener;
use tower_http::services::ServeDir;
use tracing::warn;

use crate::config::Config;
use crate::dispatch::{DispatchError, Dispatcher, SendRequest};
use crate::landing::{AckError, LandingHandler};
use crate::pages;
use crate::store::MessageStore;
use crate::transport::SmsTransport;

pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn MessageStore>,
    pub dispatcher: Dispatcher,
    pub landing: LandingHandler,
}

impl AppState {
    pub fn new(
        config: Config,
        store: Arc<dyn MessageStore>,
        transport: Arc<dyn SmsTransport>,
    ) -> Arc<Self> {
        let config = Arc::new(config);
        Arc::new(Self {
            dispatcher: Dispatcher::new(config.clone(), store.clone(), transport),
            landing: LandingHandler::new(store.clone()),
            config,
            store,
        })
    }
}

// ─── API types ───────────────────────────────────────────────────────────────

#[derive(Serialize, Default)]
struct SendResponse {
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    landing: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    provider: Option<ProviderResponse>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct DedupeRequest {
    raw: String,
}

#[derive(Serialize, Default)]
struct NumbersResponse {
    numbers: Vec<String>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct SeenRequest {
    id: String,
}

#[derive(Serialize)]
struct AckResponse {
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Serialize)]
struct LogsResponse {
    logs: Vec<MessageRecord>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct LandingQuery {
    id: String,
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    records: usize,
}

fn lenient_json<T: DeserializeOwned + Default>(body: &[u8]) -> T {
    serde_json::from_slice(body).unwrap_or_default()
}

/// Address recorded for a seen event.
fn source_address(peer: SocketAddr, headers: &HeaderMap, trust_forwarded: bool) -> String {
    if trust_forwarded {
        let forwarded = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty());
        if let Some(client) = forwarded {
            return client.to_string();
        }
    }
    peer.ip().to_string()
}

// ─── Pages ───────────────────────────────────────────────────────────────────

async fn index_handler(State(state): State<Arc<AppState>>) -> Html<String> {
    Html(pages::index(&state.config))
}

async fn history_handler() -> Redirect {
    Redirect::to("/")
}

async fn manifest_handler(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(pages::manifest(&state.config))
}

async fn service_worker_handler() -> impl IntoResponse {
    ([(CONTENT_TYPE, "application/javascript")], pages::SERVICE_WORKER)
}

async fn landing_handler(
    State(state): State<Arc<AppState>>,
    query: Result<Query<LandingQuery>, QueryRejection>,
) -> Response {
    let id = query.map(|Query(q)| q.id).unwrap_or_default();
    match state.landing.resolve(&id).await {
        Some(record) => Html(pages::landing(&state.config, &record)).into_response(),
        None => (StatusCode::NOT_FOUND, Html(pages::NOT_FOUND_PAGE)).into_response(),
    }
}

// ─── Send / Seen ─────────────────────────────────────────────────────────────

async fn send_handler(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> (StatusCode, Json<SendResponse>) {
    let request: SendRequest = lenient_json(&body);
    match state.dispatcher.send(&request).await {
        Ok(outcome) if outcome.ok => (
            StatusCode::OK,
            Json(SendResponse {
                ok: true,
                id: Some(outcome.id),
                landing: Some(outcome.landing_url),
                ..Default::default()
            }),
        ),
        Ok(outcome) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(SendResponse {
                ok: false,
                id: Some(outcome.id),
                landing: Some(outcome.landing_url),
                error: Some("Provider error".to_string()),
                provider: Some(outcome.provider),
            }),
        ),
        Err(DispatchError::Validation(e)) => (
            StatusCode::BAD_REQUEST,
            Json(SendResponse {
                error: Some(e.to_string()),
                ..Default::default()
            }),
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(SendResponse {
                error: Some(e.to_string()),
                ..Default::default()
            }),
        ),
    }
}

async fn seen_handler(
    State(state): State<Arc<AppState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, Json<AckResponse>) {
    let request: SeenRequest = lenient_json(&body);
    let source = source_address(peer, &headers, state.config.trust_forwarded);
    match state.landing.ack(&request.id, Some(source)).await {
        Ok(()) => (StatusCode::OK, Json(AckResponse { ok: true, error: None })),
        Err(AckError::MissingId) => (
            StatusCode::BAD_REQUEST,
            Json(AckResponse {
                ok: false,
                error: Some("missing id".to_string()),
            }),
        ),
        Err(e @ AckError::Store(_)) => {
            warn!(error = %e, "failed to record seen event");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(AckResponse {
                    ok: false,
                    error: Some(e.to_string()),
                }),
            )
        }
    }
}

// ─── Recipient tools / history ───────────────────────────────────────────────

async fn dedupe_handler(body: Bytes) -> Json<NumbersResponse> {
    let request: DedupeRequest = lenient_json(&body);
    Json(NumbersResponse {
        numbers: normalize_msisdns(&request.raw),
    })
}

async fn parse_csv_handler(
    multipart: Result<Multipart, MultipartRejection>,
) -> Json<NumbersResponse> {
    let mut multipart = match multipart {
        Ok(m) => m,
        Err(e) => {
            warn!(error = %e, "CSV upload was not multipart");
            return Json(NumbersResponse::default());
        }
    };

    loop {
        match multipart.next_field().await {
            Ok(Some(field)) if field.name() == Some("file") => {
                return match field.bytes().await {
                    Ok(bytes) => {
                        let extraction = extract_numbers(&bytes);
                        if extraction.skipped_rows > 0 {
                            warn!(skipped = extraction.skipped_rows, "skipped unreadable CSV rows");
                        }
                        Json(NumbersResponse {
                            numbers: extraction.numbers,
                        })
                    }
                    Err(e) => {
                        warn!(error = %e, "failed to read CSV upload");
                        Json(NumbersResponse::default())
                    }
                };
            }
            Ok(Some(_)) => continue,
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "malformed multipart body");
                break;
            }
        }
    }
    Json(NumbersResponse::default())
}

async fn get_logs_handler(State(state): State<Arc<AppState>>) -> Json<LogsResponse> {
    Json(LogsResponse {
        logs: state.store.load().await,
    })
}

async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        records: state.store.load().await.len(),
    })
}

// ─── Router ──────────────────────────────────────────────────────────────────

pub fn router(state: Arc<AppState>) -> Router {
    let static_files = ServeDir::new(&state.config.static_dir);
    Router::new()
        .route("/", get(index_handler))
        .route("/history", get(history_handler))
        .route("/manifest.json", get(manifest_handler))
        .route("/sw.js", get(service_worker_handler))
        .route("/health", get(health_handler))
        .route("/send", post(send_handler))
        .route("/seen", post(seen_handler))
        .route("/r", get(landing_handler))
        .route("/api/get_logs", get(get_logs_handler))
        .route("/api/dedupe", post(dedupe_handler))
        .route("/api/parse_csv", post(parse_csv_handler))
        .nest_service("/static", static_files)
        .with_state(state)
}

/// Serve until `shutdown` resolves. Peer addresses are exposed to handlers.
pub async fn serve(
    listener: TcpListener,
    state: Arc<AppState>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    axum::serve(
        listener,
        router(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await
}
