//! Serde helpers for timestamp columns.
//!
//! Rows written by older clients carry naive ISO-8601 strings without an offset;
//! those are read as UTC. Everything written back uses RFC 3339 in UTC with
//! microsecond precision so textual ordering matches chronological ordering.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde::{de::Error as _, Deserialize, Deserializer, Serializer};

/// Parse an RFC 3339 timestamp, or a naive one interpreted as UTC.
#[must_use]
pub fn parse(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .map(|naive| naive.and_utc())
}

#[must_use]
pub fn format(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// # Errors
/// Propagates serializer failures.
pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format(value))
}

/// # Errors
/// Fails when the value is not a recognizable timestamp.
pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
    let raw = String::deserialize(deserializer)?;
    parse(&raw).ok_or_else(|| D::Error::custom(format!("invalid timestamp: {raw}")))
}
