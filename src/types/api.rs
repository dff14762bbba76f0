use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const TRANSPORT_ERROR_CODE: i32 = -1;
pub const CANCELLED_ERROR_CODE: i32 = -2;
pub const PARSE_ERROR_CODE: i32 = -3;

/// Every failure a request can end with. HTTP failures carry the status as
/// their code, the rest use negative codes.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ServerError {
    #[error("Request failed: {0}")]
    Transport(String),
    #[error("Server responded with {status}: {details}")]
    HttpStatus { status: u16, details: String },
    #[error("Invalid field '{field}': {reason}")]
    Parse { field: String, reason: String },
    #[error("Request cancelled")]
    Cancelled,
}

impl ServerError {
    pub fn parse(field: impl Into<String>, reason: impl Into<String>) -> ServerError {
        ServerError::Parse {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn code(&self) -> i32 {
        match self {
            ServerError::Transport(_) => TRANSPORT_ERROR_CODE,
            ServerError::HttpStatus { status, .. } => i32::from(*status),
            ServerError::Parse { .. } => PARSE_ERROR_CODE,
            ServerError::Cancelled => CANCELLED_ERROR_CODE,
        }
    }

    /// Message meant to be shown to users as-is.
    pub fn details(&self) -> String {
        match self {
            ServerError::HttpStatus { details, .. } => details.clone(),
            ServerError::Transport(details) => details.clone(),
            _ => self.to_string(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, ServerError::Cancelled)
    }

    /// Prefixes the field of a parse error with the path of its parent, so
    /// errors deep inside a record read like `versions[2].hash`.
    pub fn within(self, parent: &str) -> ServerError {
        match self {
            ServerError::Parse { field, reason } if field.is_empty() => ServerError::Parse {
                field: parent.to_string(),
                reason,
            },
            ServerError::Parse { field, reason } => ServerError::Parse {
                field: format!("{}.{}", parent, field),
                reason,
            },
            other => other,
        }
    }

    /// Builds the error for a non-2xx response, preferring the message the
    /// index puts in its `error` field.
    pub fn from_status(status: u16, body: &[u8]) -> ServerError {
        let details = match serde_json::from_slice::<ErrorBody>(body) {
            Ok(b) if !b.error.is_empty() => b.error,
            _ => match std::str::from_utf8(body) {
                Ok(text) if !text.trim().is_empty() => {
                    let excerpt: String = text.trim().chars().take(200).collect();
                    format!("HTTP {}: {}", status, excerpt)
                }
                _ => format!("HTTP {}", status),
            },
        };
        ServerError::HttpStatus { status, details }
    }
}

impl From<reqwest::Error> for ServerError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ServerError::Transport(format!("Request timed out: {}", e))
        } else if e.is_connect() {
            ServerError::Transport(format!("Couldn't connect to server: {}", e))
        } else {
            ServerError::Transport(e.to_string())
        }
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: String,
}

/// Unwraps the `{ "error": "", "payload": ... }` envelope every JSON
/// endpoint of the index responds with.
pub fn parse_payload(body: &[u8]) -> Result<Value, ServerError> {
    let mut json: Value = serde_json::from_slice(body)
        .map_err(|e| ServerError::parse("<body>", format!("not valid JSON: {}", e)))?;
    match json.get_mut("payload") {
        Some(payload) => Ok(payload.take()),
        None => Err(ServerError::parse("payload", "missing field")),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Progress {
    pub message: String,
    pub percentage: Option<u8>,
}

impl Progress {
    pub fn new(message: impl Into<String>, percentage: Option<u8>) -> Progress {
        Progress {
            message: message.into(),
            percentage: percentage.map(|p| p.min(100)),
        }
    }

    pub fn transfer(downloaded: u64, total: Option<u64>) -> Progress {
        let percentage = match total {
            Some(total) if total > 0 => Some((downloaded.min(total) * 100 / total) as u8),
            _ => None,
        };
        Progress::new("Downloading", percentage)
    }
}
