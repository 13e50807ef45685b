//! Phone number normalization toward Greek-default MSISDNs.
//!
//! Recipients arrive as freeform text typed into a box or pulled out of an
//! uploaded sheet. Everything is reduced to bare digits with a country code
//! and no leading `+` or `00`, e.g. `306912345678`.

/// Country code assumed for numbers entered without one.
pub const DEFAULT_COUNTRY_CODE: &str = "30";

/// Prefix of Greek mobile numbers written in national form.
pub const MOBILE_PREFIX: &str = "69";

const SEPARATORS: [char; 5] = [',', ';', '\t', '\n', '\r'];

/// Canonicalize a single fragment, or `None` if nothing dialable is left.
///
/// Leading zeros (the `0` trunk prefix and the `00` international prefix)
/// are dropped before the country code check, so `0030...`, `030...` and
/// `30...` all land on the same form.
pub fn canonicalize(fragment: &str) -> Option<String> {
    let digits: String = fragment.chars().filter(|c| c.is_ascii_digit()).collect();
    let digits = digits.trim_start_matches('0');
    if digits.is_empty() {
        return None;
    }

    if digits.starts_with(DEFAULT_COUNTRY_CODE) {
        Some(digits.to_string())
    } else if digits.starts_with(MOBILE_PREFIX) {
        Some(format!("{DEFAULT_COUNTRY_CODE}{digits}"))
    } else {
        // Some other country code; leave it alone.
        Some(digits.to_string())
    }
}

/// Split raw recipient text and return unique canonical numbers in first-seen order.
pub fn normalize_msisdns(raw: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for fragment in raw.split(SEPARATORS) {
        let fragment = fragment.trim();
        if fragment.is_empty() {
            continue;
        }
        if let Some(number) = canonicalize(fragment) {
            if !out.contains(&number) {
                out.push(number);
            }
        }
    }
    out
}
