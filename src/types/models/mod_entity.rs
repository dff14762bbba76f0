use std::collections::BTreeSet;

use semver::Version;
use serde::Serialize;
use serde_json::Value;

use crate::types::{
    api::ServerError,
    json::{parse_each, Fields},
};

use super::{
    developer::DeveloperInfo, mod_version::ModVersionRecord, tag::parse_tags,
    timestamp::ServerTimestamp,
};

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ModRecord {
    id: String,
    pub featured: bool,
    pub download_count: u64,
    pub developers: Vec<DeveloperInfo>,
    /// In the order the index sent them, newest first.
    pub versions: Vec<ModVersionRecord>,
    pub tags: BTreeSet<String>,
    pub about: Option<String>,
    pub changelog: Option<String>,
    pub repository: Option<String>,
    pub created_at: Option<ServerTimestamp>,
    pub updated_at: Option<ServerTimestamp>,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct ModListResult {
    pub mods: Vec<ModRecord>,
    /// Matches across all pages, not just this one.
    pub total_mod_count: u64,
}

fn parse_timestamp(fields: &Fields, field: &str) -> Result<Option<ServerTimestamp>, ServerError> {
    fields
        .opt_str(field)?
        .map(|s| ServerTimestamp::parse(s).map_err(|e| e.within(field)))
        .transpose()
}

impl ModRecord {
    pub fn parse(json: &Value) -> Result<ModRecord, ServerError> {
        let fields = Fields::of(json)?;
        let id = fields.str("id")?.to_string();

        let versions = parse_each("versions", fields.array("versions")?, ModVersionRecord::parse)?;
        if versions.is_empty() {
            return Err(ServerError::parse("versions", "mod has no versions"));
        }

        let tags = match fields.opt_array("tags")? {
            Some(tags) => parse_tags("tags", tags)?,
            None => BTreeSet::new(),
        };

        Ok(ModRecord {
            id,
            featured: fields.bool("featured")?,
            download_count: fields.u64("download_count")?,
            developers: parse_each("developers", fields.array("developers")?, DeveloperInfo::parse)?,
            versions,
            tags,
            about: fields.opt_str("about")?.map(str::to_string),
            changelog: fields.opt_str("changelog")?.map(str::to_string),
            repository: fields.opt_str("repository")?.map(str::to_string),
            created_at: parse_timestamp(&fields, "created_at")?,
            updated_at: parse_timestamp(&fields, "updated_at")?,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn latest_version(&self) -> &ModVersionRecord {
        // parse() refuses records without versions
        &self.versions[0]
    }

    pub fn version(&self, version: &Version) -> Option<&ModVersionRecord> {
        self.versions.iter().find(|v| v.version() == version)
    }

    /// Name of the mod as of its latest version.
    pub fn name(&self) -> &str {
        &self.latest_version().metadata.name
    }
}

impl ModListResult {
    pub fn parse(json: &Value) -> Result<ModListResult, ServerError> {
        let fields = Fields::of(json)?;
        Ok(ModListResult {
            mods: parse_each("data", fields.array("data")?, ModRecord::parse)?,
            total_mod_count: fields.opt_u64("count")?.unwrap_or(0),
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::types::models::mod_version::tests::version_json;
    use serde_json::json;

    pub(crate) fn mod_json(id: &str) -> Value {
        json!({
            "id": id,
            "repository": "https://github.com/HJfod/BetterEdit",
            "featured": true,
            "download_count": 90210,
            "developers": [
                { "id": 3, "username": "hjfod", "display_name": "HJfod", "is_owner": true }
            ],
            "versions": [version_json("6.5.0"), version_json("6.4.1")],
            "tags": ["editor", "enhancement"],
            "about": "# BetterEdit",
            "changelog": null,
            "created_at": "2024-01-10T09:00:00Z",
            "updated_at": "2024-05-01T17:03:00Z",
            "links": { "community": null }
        })
    }

    #[test]
    fn parses_every_present_field() {
        let m = ModRecord::parse(&mod_json("hjfod.betteredit")).unwrap();
        assert_eq!(m.id(), "hjfod.betteredit");
        assert!(m.featured);
        assert_eq!(m.download_count, 90210);
        assert_eq!(
            m.developers,
            vec![DeveloperInfo {
                username: "hjfod".into(),
                display_name: "HJfod".into()
            }]
        );
        assert_eq!(m.versions.len(), 2);
        assert_eq!(m.latest_version().version(), &Version::new(6, 5, 0));
        assert_eq!(m.versions[1].version(), &Version::new(6, 4, 1));
        assert_eq!(
            m.tags,
            BTreeSet::from(["editor".to_string(), "enhancement".to_string()])
        );
        assert_eq!(m.about.as_deref(), Some("# BetterEdit"));
        assert_eq!(m.changelog, None);
        assert_eq!(m.repository.as_deref(), Some("https://github.com/HJfod/BetterEdit"));
        assert_eq!(
            m.created_at,
            Some(ServerTimestamp::parse("2024-01-10T09:00:00Z").unwrap())
        );
        assert_eq!(m.name(), "Better Edit");
        assert!(m.version(&Version::new(6, 4, 1)).is_some());
        assert!(m.version(&Version::new(1, 0, 0)).is_none());
    }

    #[test]
    fn missing_required_fields_are_named() {
        for field in ["id", "featured", "download_count", "developers", "versions"] {
            let mut json = mod_json("hjfod.betteredit");
            json.as_object_mut().unwrap().remove(field);
            let err = ModRecord::parse(&json).unwrap_err();
            assert_eq!(err, ServerError::parse(field, "missing field"));
        }
    }

    #[test]
    fn optional_fields_are_none_when_absent() {
        let mut json = mod_json("hjfod.betteredit");
        for field in ["about", "repository", "created_at", "updated_at", "tags"] {
            json.as_object_mut().unwrap().remove(field);
        }
        let m = ModRecord::parse(&json).unwrap();
        assert_eq!(m.about, None);
        assert_eq!(m.repository, None);
        assert_eq!(m.created_at, None);
        assert!(m.tags.is_empty());
    }

    #[test]
    fn one_bad_version_fails_the_record() {
        let mut json = mod_json("hjfod.betteredit");
        json["versions"][1]["hash"] = json!("nope");
        let err = ModRecord::parse(&json).unwrap_err();
        assert!(matches!(err, ServerError::Parse { ref field, .. } if field == "versions[1].hash"));
    }

    #[test]
    fn empty_versions_fail() {
        let mut json = mod_json("hjfod.betteredit");
        json["versions"] = json!([]);
        let err = ModRecord::parse(&json).unwrap_err();
        assert!(matches!(err, ServerError::Parse { ref field, .. } if field == "versions"));
    }

    #[test]
    fn bad_timestamp_names_the_field() {
        let mut json = mod_json("hjfod.betteredit");
        json["updated_at"] = json!("yesterday");
        let err = ModRecord::parse(&json).unwrap_err();
        assert!(matches!(err, ServerError::Parse { ref field, .. } if field == "updated_at"));
    }

    #[test]
    fn list_count_defaults_to_zero() {
        let list = ModListResult::parse(&json!({ "data": [mod_json("a.b")] })).unwrap();
        assert_eq!(list.mods.len(), 1);
        assert_eq!(list.total_mod_count, 0);

        let list = ModListResult::parse(&json!({ "data": [], "count": 42 })).unwrap();
        assert!(list.mods.is_empty());
        assert_eq!(list.total_mod_count, 42);
    }

    #[test]
    fn list_propagates_first_failure() {
        let mut bad = mod_json("c.d");
        bad.as_object_mut().unwrap().remove("featured");
        let err =
            ModListResult::parse(&json!({ "data": [mod_json("a.b"), bad], "count": 2 })).unwrap_err();
        assert_eq!(err, ServerError::parse("data[1].featured", "missing field"));
    }
}
