//! Operator UI, landing page and PWA assets.

use serde_json::{json, Value};
use teamalert_common::message::MessageRecord;

use crate::config::Config;

const INDEX_TEMPLATE: &str = include_str!("../templates/index.html");
const LANDING_TEMPLATE: &str = include_str!("../templates/landing.html");

pub const SERVICE_WORKER: &str = "self.addEventListener('install',e=>self.skipWaiting());\
self.addEventListener('activate',e=>self.clients.claim());\
self.addEventListener('fetch',()=>{});";

pub const NOT_FOUND_PAGE: &str = "<!doctype html><html lang=\"el\"><head><meta charset=\"utf-8\">\
<title>Not found</title></head><body><h1>404</h1><p>Το μήνυμα δεν βρέθηκε.</p></body></html>";

/// Escape text for HTML element content and quoted attribute values.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn index(config: &Config) -> String {
    INDEX_TEMPLATE
        .replace("{{team}}", &escape_html(&config.team_name))
        .replace("{{base_url}}", &escape_html(&config.public_base_url))
        .replace("{{sender}}", &escape_html(&config.sender))
}

pub fn landing(config: &Config, record: &MessageRecord) -> String {
    // Message text goes in last so nothing inside it is treated as a placeholder.
    LANDING_TEMPLATE
        .replace("{{team}}", &escape_html(&config.team_name))
        .replace("{{id}}", &escape_html(&record.id))
        .replace("{{text}}", &escape_html(&record.text))
}

pub fn manifest(config: &Config) -> Value {
    json!({
        "name": format!("{} Alerts", config.team_name),
        "short_name": "Alerts",
        "start_url": "/",
        "display": "standalone",
        "background_color": "#0b1020",
        "theme_color": "#111827",
        "icons": [
            {"src": "/static/icons/icon-180.png", "sizes": "180x180", "type": "image/png"},
            {"src": "/static/icons/icon-512.png", "sizes": "512x512", "type": "image/png"}
        ]
    })
}
