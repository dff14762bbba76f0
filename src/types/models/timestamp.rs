use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;

use crate::types::{api::ServerError, serde::chrono_dt_secs};

const MINUTE: i64 = 60;
const HOUR: i64 = 60 * MINUTE;
const DAY: i64 = 24 * HOUR;
const MONTH: i64 = 30 * DAY;
const YEAR: i64 = 365 * DAY;

/// An instant as the index sends it: `2024-05-01T17:03:00Z`.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ServerTimestamp(#[serde(with = "chrono_dt_secs")] DateTime<Utc>);

impl ServerTimestamp {
    pub fn new(value: DateTime<Utc>) -> ServerTimestamp {
        ServerTimestamp(value)
    }

    pub fn parse(s: &str) -> Result<ServerTimestamp, ServerError> {
        // chrono tolerates unpadded fields, the wire format doesn't
        if s.len() != 20 {
            return Err(ServerError::parse(
                "",
                format!("invalid timestamp {}, expected YYYY-MM-DDTHH:MM:SSZ", s),
            ));
        }
        NaiveDateTime::parse_from_str(s, chrono_dt_secs::FORMAT)
            .map(|dt| ServerTimestamp(dt.and_utc()))
            .map_err(|e| ServerError::parse("", format!("invalid timestamp {}: {}", s, e)))
    }

    pub fn value(&self) -> DateTime<Utc> {
        self.0
    }

    pub fn to_ago_string(&self) -> String {
        self.to_ago_string_at(Utc::now())
    }

    pub fn to_ago_string_at(&self, now: DateTime<Utc>) -> String {
        let secs = (now - self.0).num_seconds().max(0);
        let (count, unit) = if secs < MINUTE {
            (secs, "second")
        } else if secs < HOUR {
            (secs / MINUTE, "minute")
        } else if secs < DAY {
            (secs / HOUR, "hour")
        } else if secs < MONTH {
            (secs / DAY, "day")
        } else if secs < YEAR {
            (secs / MONTH, "month")
        } else {
            (secs / YEAR, "year")
        };
        if count == 1 {
            format!("1 {} ago", unit)
        } else {
            format!("{} {}s ago", count, unit)
        }
    }
}
