use std::collections::BTreeSet;

use serde_json::Value;

use crate::types::{api::ServerError, json::parse_each};

pub fn parse_tags(field: &str, tags: &[Value]) -> Result<BTreeSet<String>, ServerError> {
    let tags = parse_each(field, tags, |t| match t {
        Value::String(s) => Ok(s.trim().to_lowercase()),
        _ => Err(ServerError::parse("", "expected string")),
    })?;
    Ok(tags.into_iter().filter(|t| !t.is_empty()).collect())
}
