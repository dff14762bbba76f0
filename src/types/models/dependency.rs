use std::str::FromStr;

use semver::Version;
use serde::Serialize;
use serde_json::Value;

use crate::types::{api::ServerError, json::Fields};

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DependencyImportance {
    Suggested,
    Recommended,
    Required,
}

impl FromStr for DependencyImportance {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, ()> {
        match s {
            "suggested" => Ok(DependencyImportance::Suggested),
            "recommended" => Ok(DependencyImportance::Recommended),
            "required" => Ok(DependencyImportance::Required),
            _ => Err(()),
        }
    }
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModVersionCompare {
    #[serde(rename = "=")]
    Exact,
    #[serde(rename = ">")]
    More,
    #[serde(rename = ">=")]
    MoreEq,
    #[serde(rename = "<")]
    Less,
    #[serde(rename = "<=")]
    LessEq,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ModDependency {
    pub id: String,
    pub compare: ModVersionCompare,
    pub version: Version,
    pub importance: DependencyImportance,
}

impl ModDependency {
    pub fn parse(json: &Value) -> Result<ModDependency, ServerError> {
        let fields = Fields::of(json)?;
        let id = fields.str("mod_id")?.to_string();
        let raw_version = fields.str("version")?;
        let (version, compare) = split_version_and_compare(raw_version).ok_or_else(|| {
            ServerError::parse("version", format!("invalid version requirement {}", raw_version))
        })?;
        let raw_importance = fields.str("importance")?;
        let importance = DependencyImportance::from_str(raw_importance).map_err(|_| {
            ServerError::parse("importance", format!("unknown importance {}", raw_importance))
        })?;

        Ok(ModDependency {
            id,
            compare,
            version,
            importance,
        })
    }
}

/// Parses semver leniently: a leading `v` is accepted, as the index does.
pub fn parse_version(ver: &str) -> Option<Version> {
    Version::parse(ver.trim().trim_start_matches('v')).ok()
}

fn split_version_and_compare(ver: &str) -> Option<(Version, ModVersionCompare)> {
    let ver = ver.trim();
    let (rest, compare) = if let Some(rest) = ver.strip_prefix("<=") {
        (rest, ModVersionCompare::LessEq)
    } else if let Some(rest) = ver.strip_prefix(">=") {
        (rest, ModVersionCompare::MoreEq)
    } else if let Some(rest) = ver.strip_prefix('=') {
        (rest, ModVersionCompare::Exact)
    } else if let Some(rest) = ver.strip_prefix('<') {
        (rest, ModVersionCompare::Less)
    } else if let Some(rest) = ver.strip_prefix('>') {
        (rest, ModVersionCompare::More)
    } else {
        (ver, ModVersionCompare::MoreEq)
    };
    parse_version(rest).map(|v| (v, compare))
}
