//! Boundary normalization for the timestamp shapes external callers send.
//!
//! Three wire shapes are accepted: a `{seconds, nanoseconds}` object, a bare
//! epoch-seconds number, and an ISO-8601 string. Everything becomes a
//! `DateTime<Utc>` during deserialization; nothing downstream ever inspects
//! the wire shape.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer};

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum ExternalTimestamp {
    Epoch {
        seconds: i64,
        #[serde(default, alias = "nanos")]
        nanoseconds: u32,
    },
    Seconds(i64),
    Text(String),
}

fn resolve(raw: ExternalTimestamp) -> Result<DateTime<Utc>, String> {
    match raw {
        ExternalTimestamp::Epoch {
            seconds,
            nanoseconds,
        } => DateTime::<Utc>::from_timestamp(seconds, nanoseconds)
            .ok_or_else(|| format!("epoch timestamp out of range: {seconds}s {nanoseconds}ns")),
        ExternalTimestamp::Seconds(seconds) => DateTime::<Utc>::from_timestamp(seconds, 0)
            .ok_or_else(|| format!("epoch timestamp out of range: {seconds}s")),
        ExternalTimestamp::Text(text) => {
            let trimmed = text.trim();
            if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
                return Ok(parsed.with_timezone(&Utc));
            }
            if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
                if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
                    return Ok(midnight.and_utc());
                }
            }
            Err(format!("'{text}' is not an ISO-8601 timestamp or date"))
        }
    }
}

pub fn deserialize_opt<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<ExternalTimestamp>::deserialize(deserializer)?;
    raw.map(|value| resolve(value).map_err(serde::de::Error::custom))
        .transpose()
}
