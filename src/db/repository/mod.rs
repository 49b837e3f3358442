pub mod conversation;
pub mod diagnosis;
pub mod report;
pub mod symptom;
pub mod user;

use chrono::NaiveDateTime;

use super::sqlite::DATETIME_FORMAT;

/// Current UTC timestamp, truncated to the storage resolution.
pub(crate) fn now() -> NaiveDateTime {
    let stamp = chrono::Utc::now().naive_utc();
    // Round-trips through the storage format so equality checks are stable.
    parse_ts(&format_ts(stamp))
}

pub(crate) fn format_ts(dt: NaiveDateTime) -> String {
    dt.format(DATETIME_FORMAT).to_string()
}

pub(crate) fn parse_ts(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, DATETIME_FORMAT).unwrap_or_default()
}

pub(crate) fn format_opt_ts(dt: Option<NaiveDateTime>) -> Option<String> {
    dt.map(format_ts)
}

pub(crate) fn parse_opt_ts(s: Option<String>) -> Option<NaiveDateTime> {
    s.map(|v| parse_ts(&v))
}

/// Serialize a string list into its JSON-text column form.
pub(crate) fn encode_list(items: &[String]) -> String {
    serde_json::to_string(items).unwrap_or_else(|_| "[]".to_string())
}

/// Parse a JSON-text column back into a string list. Bad data yields empty.
pub(crate) fn decode_list(raw: &str) -> Vec<String> {
    serde_json::from_str(raw).unwrap_or_default()
}
