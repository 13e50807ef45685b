//! SMS provider client (Yuboto OMNI).
//!
//! One batch call per send: every recipient goes into a single request.
//! The outcome is never an error; whatever happened is captured as a
//! [`ProviderResponse`] for the message log.

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::Serialize;
use serde_json::{json, Value};
use teamalert_common::message::ProviderResponse;
use tracing::{info, warn};

use crate::config::{Config, PROVIDER_TIMEOUT};

/// Validity of an SMS in minutes.
const SMS_VALIDITY_MINUTES: u32 = 180;

/// Outcome of one batch send.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportResult {
    pub success: bool,
    pub response: ProviderResponse,
}

impl TransportResult {
    fn failed(response: ProviderResponse) -> Self {
        Self {
            success: false,
            response,
        }
    }
}

#[async_trait]
pub trait SmsTransport: Send + Sync {
    async fn send_batch(&self, sender: &str, text: &str, recipients: &[String]) -> TransportResult;
}

// ─── OMNI wire types ─────────────────────────────────────────────────────────

#[derive(Serialize)]
struct OmniSendRequest<'a> {
    dlr: bool,
    contacts: Vec<OmniContact<'a>>,
    sms: OmniSms<'a>,
}

#[derive(Serialize)]
struct OmniContact<'a> {
    phonenumber: &'a str,
}

#[derive(Serialize)]
struct OmniSms<'a> {
    sender: &'a str,
    text: &'a str,
    validity: u32,
    typesms: &'static str,
    longsms: bool,
    priority: u8,
}

// ─── Client ──────────────────────────────────────────────────────────────────

pub struct YubotoTransport {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl YubotoTransport {
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(PROVIDER_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            api_key,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, reqwest::Error> {
        Self::new(config.provider_url.clone(), config.api_key.clone())
    }
}

#[async_trait]
impl SmsTransport for YubotoTransport {
    async fn send_batch(&self, sender: &str, text: &str, recipients: &[String]) -> TransportResult {
        let Some(api_key) = self.api_key.as_deref() else {
            warn!("no provider credential configured; message not sent");
            return TransportResult::failed(ProviderResponse::Rejected {
                error: "Missing YUBOTO_API_KEY env".to_string(),
            });
        };

        let payload = OmniSendRequest {
            dlr: false,
            contacts: recipients
                .iter()
                .map(|n| OmniContact { phonenumber: n })
                .collect(),
            sms: OmniSms {
                sender,
                text,
                validity: SMS_VALIDITY_MINUTES,
                typesms: "sms",
                longsms: false,
                priority: 1,
            },
        };
        let body = match serde_json::to_vec(&payload) {
            Ok(body) => body,
            Err(e) => {
                return TransportResult::failed(ProviderResponse::Exception {
                    exception: format!("failed to encode request: {e}"),
                })
            }
        };

        let resp = match self
            .client
            .post(&self.endpoint)
            .header(AUTHORIZATION, format!("Basic {api_key}"))
            .header(CONTENT_TYPE, "application/json; charset=utf-8")
            .body(body)
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(e) => {
                warn!(error = %e, "SMS provider request failed");
                return TransportResult::failed(ProviderResponse::Exception {
                    exception: e.to_string(),
                });
            }
        };

        let status = resp.status();
        let raw = match resp.text().await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(status = status.as_u16(), error = %e, "failed to read SMS provider response");
                return TransportResult::failed(ProviderResponse::Exception {
                    exception: e.to_string(),
                });
            }
        };

        // A body that is not JSON is kept raw and counts as a failure even on 2xx.
        let (parsed, response) = match serde_json::from_str::<Value>(&raw) {
            Ok(value) => (true, value),
            Err(_) => (false, json!({ "raw": raw })),
        };
        let success = status.is_success() && parsed;
        if success {
            info!(status = status.as_u16(), recipients = recipients.len(), "SMS batch accepted");
        } else {
            warn!(status = status.as_u16(), "SMS provider rejected batch");
        }

        TransportResult {
            success,
            response: ProviderResponse::Reply {
                status_code: status.as_u16(),
                response,
            },
        }
    }
}
