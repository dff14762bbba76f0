use std::collections::HashMap;

use semver::Version;
use serde::Serialize;
use serde_json::Value;

use crate::types::{
    api::ServerError,
    json::{as_array, parse_each, Fields},
};

use super::dependency::parse_version;

/// The newest version the index has for a mod the caller asked about.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct UpdateRecord {
    pub id: String,
    pub version: Version,
}

impl UpdateRecord {
    pub fn parse(json: &Value) -> Result<UpdateRecord, ServerError> {
        let fields = Fields::of(json)?;
        let raw_version = fields.str("version")?;
        let version = parse_version(raw_version).ok_or_else(|| {
            ServerError::parse("version", format!("invalid semver {}", raw_version))
        })?;
        Ok(UpdateRecord {
            id: fields.str("id")?.to_string(),
            version,
        })
    }

    pub fn parse_list(json: &Value) -> Result<Vec<UpdateRecord>, ServerError> {
        parse_each("", as_array(json)?, UpdateRecord::parse)
    }

    /// True only when the index has something strictly newer than what is
    /// installed.
    pub fn has_update_for_installed_mod(&self, installed: &Version) -> bool {
        self.version > *installed
    }

    /// Keeps the records that are newer than the installed version of their
    /// mod. Mods missing from `installed` are skipped.
    pub fn pending_updates<'a>(
        records: &'a [UpdateRecord],
        installed: &HashMap<String, Version>,
    ) -> Vec<&'a UpdateRecord> {
        records
            .iter()
            .filter(|r| {
                installed
                    .get(&r.id)
                    .is_some_and(|v| r.has_update_for_installed_mod(v))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(version: &str) -> UpdateRecord {
        UpdateRecord {
            id: "geode.node-ids".into(),
            version: Version::parse(version).unwrap(),
        }
    }

    #[test]
    fn update_detection_uses_semver_ordering() {
        let v = |s: &str| Version::parse(s).unwrap();
        assert!(record("1.3.0").has_update_for_installed_mod(&v("1.2.0")));
        assert!(!record("1.9.9").has_update_for_installed_mod(&v("2.0.0")));
        assert!(!record("1.3.0").has_update_for_installed_mod(&v("1.3.0")));
        // string ordering would say otherwise
        assert!(record("1.10.0").has_update_for_installed_mod(&v("1.9.0")));
        assert!(record("1.0.0").has_update_for_installed_mod(&v("1.0.0-beta.2")));
    }

    #[test]
    fn parses_update_list() {
        let records = UpdateRecord::parse_list(&json!([
            {
                "id": "geode.node-ids",
                "version": "v1.13.1",
                "mod_version_id": 99,
                "download_link": "https://api.geode-sdk.org/v1/mods/geode.node-ids/versions/1.13.1/download",
                "replacement": null,
                "dependencies": [],
                "incompatibilities": []
            },
            { "id": "hjfod.betteredit", "version": "6.5.0" }
        ]))
        .unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].version, Version::new(1, 13, 1));

        let err = UpdateRecord::parse_list(&json!([{ "id": "a.b", "version": "latest" }])).unwrap_err();
        assert_eq!(err, ServerError::parse("[0].version", "invalid semver latest"));
    }

    #[test]
    fn pending_updates_filters_by_installed_version() {
        let records = vec![
            record("1.3.0"),
            UpdateRecord {
                id: "hjfod.betteredit".into(),
                version: Version::new(6, 5, 0),
            },
            UpdateRecord {
                id: "not.installed".into(),
                version: Version::new(1, 0, 0),
            },
        ];
        let installed = HashMap::from([
            ("geode.node-ids".to_string(), Version::new(1, 2, 0)),
            ("hjfod.betteredit".to_string(), Version::new(6, 5, 0)),
        ]);
        let pending = UpdateRecord::pending_updates(&records, &installed);
        assert_eq!(pending, vec![&records[0]]);
    }
}
