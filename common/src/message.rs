use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Short random message identifier (8 lowercase hex chars).
pub type MessageId = String;

pub const MESSAGE_ID_LEN: usize = 8;

const ID_ALPHABET: &[u8] = b"0123456789abcdef";

/// Timestamp format used for records and seen events.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Delivery channel. Only SMS exists today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    #[default]
    Sms,
}

impl Channel {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "sms" => Some(Channel::Sms),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Sms => "sms",
        }
    }
}

/// Free-text details of the event being announced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventDetails {
    pub place: String,
    pub date: String,
    pub time: String,
}

/// What the SMS provider said, kept verbatim for auditing.
///
/// Serialized untagged so the stored shape is exactly one of
/// `{status_code, response}`, `{exception}` or `{error}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProviderResponse {
    /// The provider answered. `response` is its JSON body, or `{"raw": text}`.
    Reply { status_code: u16, response: Value },
    /// The request never completed (connect error, timeout, TLS...).
    Exception { exception: String },
    /// The request was not attempted.
    Rejected { error: String },
}

/// A recipient acknowledging the message from its landing page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeenEvent {
    #[serde(alias = "ts")]
    pub timestamp: String,
    #[serde(alias = "ip", default)]
    pub source_address: Option<String>,
}

impl SeenEvent {
    pub fn now(source_address: Option<String>) -> Self {
        Self {
            timestamp: now_timestamp(),
            source_address,
        }
    }
}

/// One SMS blast as persisted in the message log.
///
/// Records are created once per send and afterwards only grow through
/// `seen_by`. Aliases accept logs written by the earlier deployment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageRecord {
    pub id: MessageId,
    pub timestamp: String,
    pub place: String,
    pub date: String,
    pub time: String,
    #[serde(default)]
    pub channel: Channel,
    #[serde(alias = "msisdns")]
    pub recipients: Vec<String>,
    pub text: String,
    #[serde(alias = "landing")]
    pub landing_url: String,
    pub provider_response: ProviderResponse,
    #[serde(default)]
    pub seen_by: Vec<SeenEvent>,
}

/// Generate a random id. Uniqueness against the log is the caller's job.
pub fn random_id() -> MessageId {
    let mut rng = rand::thread_rng();
    (0..MESSAGE_ID_LEN)
        .map(|_| ID_ALPHABET[rng.gen_range(0..ID_ALPHABET.len())] as char)
        .collect()
}

/// Generate an id that no record in `existing` already uses.
pub fn fresh_id(existing: &[MessageRecord]) -> MessageId {
    loop {
        let id = random_id();
        if !existing.iter().any(|r| r.id == id) {
            return id;
        }
    }
}

/// Landing page link for a message.
pub fn landing_url(public_base_url: &str, id: &str) -> String {
    format!("{}/r?id={}", public_base_url.trim_end_matches('/'), id)
}

/// Render the SMS body.
pub fn compose_text(team_name: &str, event: &EventDetails, landing_url: &str) -> String {
    format!(
        "{team_name} ⚽\nΥπενθύμιση: Παίζουμε στο {} την {} ώρα {}!\n👉 Δες περισσότερα: {landing_url}",
        event.place, event.date, event.time
    )
}

/// Current local time in [`TIMESTAMP_FORMAT`].
pub fn now_timestamp() -> String {
    chrono::Local::now().format(TIMESTAMP_FORMAT).to_string()
}
