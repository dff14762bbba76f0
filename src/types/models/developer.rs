use serde::Serialize;
use serde_json::Value;

use crate::types::{api::ServerError, json::Fields};

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct DeveloperInfo {
    pub username: String,
    pub display_name: String,
}

impl DeveloperInfo {
    pub fn parse(json: &Value) -> Result<DeveloperInfo, ServerError> {
        let fields = Fields::of(json)?;
        Ok(DeveloperInfo {
            username: fields.str("username")?.to_string(),
            display_name: fields.str("display_name")?.to_string(),
        })
    }
}
