use semver::Version;
use serde::Serialize;
use serde_json::Value;
use url::Url;

use crate::types::{
    api::ServerError,
    json::{parse_each, Fields},
};

use super::dependency::{parse_version, ModDependency};

const HASH_LEN: usize = 64;

/// The parts of a version's mod.json the index echoes back.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ModMetadata {
    pub id: String,
    pub name: String,
    pub version: Version,
    pub description: Option<String>,
    pub geode: Option<Version>,
    pub dependencies: Vec<ModDependency>,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ModVersionRecord {
    pub metadata: ModMetadata,
    pub download_url: Url,
    pub hash: String,
    pub download_count: u64,
}

impl ModMetadata {
    fn parse(fields: &Fields) -> Result<ModMetadata, ServerError> {
        let raw_version = fields.str("version")?;
        let version = parse_version(raw_version).ok_or_else(|| {
            ServerError::parse("version", format!("invalid semver {}", raw_version))
        })?;
        let geode = match fields.opt_str("geode")? {
            Some(raw) => Some(parse_version(raw).ok_or_else(|| {
                ServerError::parse("geode", format!("invalid semver {}", raw))
            })?),
            None => None,
        };
        let dependencies = match fields.opt_array("dependencies")? {
            Some(deps) => parse_each("dependencies", deps, ModDependency::parse)?,
            None => vec![],
        };

        Ok(ModMetadata {
            id: fields.str("mod_id")?.to_string(),
            name: fields.str("name")?.to_string(),
            version,
            description: fields.opt_str("description")?.map(str::to_string),
            geode,
            dependencies,
        })
    }
}

impl ModVersionRecord {
    pub fn parse(json: &Value) -> Result<ModVersionRecord, ServerError> {
        let fields = Fields::of(json)?;
        let metadata = ModMetadata::parse(&fields)?;

        let raw_url = fields.str("download_link")?;
        let download_url = Url::parse(raw_url)
            .map_err(|e| ServerError::parse("download_link", format!("invalid URL {}: {}", raw_url, e)))?;
        if download_url.scheme() != "https" && download_url.scheme() != "http" {
            return Err(ServerError::parse(
                "download_link",
                format!("unsupported URL scheme {}", download_url.scheme()),
            ));
        }

        let hash = fields.str("hash")?;
        if hash.len() != HASH_LEN || !hash.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ServerError::parse(
                "hash",
                format!("expected a {} character hex digest, got {}", HASH_LEN, hash),
            ));
        }

        Ok(ModVersionRecord {
            metadata,
            download_url,
            hash: hash.to_ascii_lowercase(),
            download_count: fields.u64("download_count")?,
        })
    }

    pub fn version(&self) -> &Version {
        &self.metadata.version
    }

    /// Checks downloaded content against the published SHA-256 digest.
    pub fn verify(&self, data: &[u8]) -> Result<(), ServerError> {
        let actual = sha256::digest(data);
        if actual != self.hash {
            return Err(ServerError::parse(
                "hash",
                format!("hash mismatch: expected {}, got {}", self.hash, actual),
            ));
        }
        Ok(())
    }
}
