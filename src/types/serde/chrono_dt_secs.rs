use chrono::{DateTime, Utc};
use serde::Serializer;

pub const FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

pub fn serialize<S: Serializer>(dt: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&dt.format(FORMAT).to_string())
}
