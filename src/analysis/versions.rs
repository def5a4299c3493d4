//! Version ranges for external packages.
//!
//! The best-known version of a package comes from, in order:
//! 1. a version written inline in the specifier (`pkg@^2.0`)
//! 2. the project's `package.json`
//! 3. the `latest` sentinel

use std::collections::BTreeMap;

use semver::VersionReq;
use serde::Deserialize;

use super::specifier::PackageSpecifier;

/// Version recorded when nothing better is known.
pub const LATEST: &str = "latest";

/// Known package versions, typically read from `package.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionTable {
    versions: BTreeMap<String, String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct PackageJson {
    dependencies: BTreeMap<String, String>,
    dev_dependencies: BTreeMap<String, String>,
    peer_dependencies: BTreeMap<String, String>,
}

impl VersionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read `dependencies`, `peerDependencies` and `devDependencies`.
    ///
    /// When a package appears in several sections, `dependencies` wins over
    /// `peerDependencies`, which wins over `devDependencies`.
    pub fn from_package_json(text: &str) -> serde_json::Result<Self> {
        let manifest: PackageJson = serde_json::from_str(text)?;

        let mut table = VersionTable::new();
        for section in [
            manifest.dev_dependencies,
            manifest.peer_dependencies,
            manifest.dependencies,
        ] {
            for (name, version) in section {
                table.insert(name, version);
            }
        }
        Ok(table)
    }

    /// Record a version; blank versions are ignored.
    pub fn insert(&mut self, name: impl Into<String>, version: impl Into<String>) {
        let version = version.into();
        if !version.trim().is_empty() {
            self.versions.insert(name.into(), version.trim().to_string());
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.versions.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    /// Best-known version for a package import.
    pub fn version_for(&self, package: &PackageSpecifier<'_>, sentinel: &str) -> String {
        package
            .version_hint
            .filter(|hint| is_valid_hint(hint))
            .or_else(|| self.get(package.name))
            .unwrap_or(sentinel)
            .to_string()
    }
}

/// A semver range or a dist-tag such as `next`.
pub fn is_valid_hint(hint: &str) -> bool {
    if VersionReq::parse(hint).is_ok() {
        return true;
    }

    hint.starts_with(|c: char| c.is_ascii_alphabetic())
        && hint
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_'))
}

/// Insert `version` for `name`, keeping the first non-sentinel version seen.
pub fn record_version(
    map: &mut BTreeMap<String, String>,
    name: &str,
    version: &str,
    sentinel: &str,
) {
    match map.get_mut(name) {
        Some(existing) if existing == sentinel && version != sentinel => {
            *existing = version.to_string();
        }
        Some(_) => {}
        None => {
            map.insert(name.to_string(), version.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(s: &str) -> PackageSpecifier<'_> {
        PackageSpecifier::parse(s).unwrap()
    }

    #[test]
    fn test_package_json_sections() {
        let table = VersionTable::from_package_json(
            r#"{
                "name": "app",
                "dependencies": { "react": "^18.2.0", "clsx": "^2.0.0" },
                "devDependencies": { "react": "^17.0.0", "vitest": "^1.0.0" },
                "peerDependencies": { "react-dom": "^18.0.0" }
            }"#,
        )
        .unwrap();

        assert_eq!(table.get("react"), Some("^18.2.0"));
        assert_eq!(table.get("vitest"), Some("^1.0.0"));
        assert_eq!(table.get("react-dom"), Some("^18.0.0"));
        assert_eq!(table.len(), 4);
    }

    #[test]
    fn test_lookup_order() {
        let mut table = VersionTable::new();
        table.insert("framer-motion", "^11.0.0");

        assert_eq!(table.version_for(&spec("framer-motion@^10.1"), LATEST), "^10.1");
        assert_eq!(table.version_for(&spec("framer-motion"), LATEST), "^11.0.0");
        assert_eq!(table.version_for(&spec("clsx"), LATEST), "latest");
        assert_eq!(table.version_for(&spec("clsx@next"), LATEST), "next");
        assert_eq!(table.version_for(&spec("clsx@^^bad"), LATEST), "latest");
    }

    #[test]
    fn test_first_non_sentinel_wins() {
        let mut map = BTreeMap::new();
        record_version(&mut map, "react", LATEST, LATEST);
        record_version(&mut map, "react", "^18.0.0", LATEST);
        record_version(&mut map, "react", "^17.0.0", LATEST);
        record_version(&mut map, "react", LATEST, LATEST);
        assert_eq!(map["react"], "^18.0.0");
    }

    #[test]
    fn test_invalid_package_json() {
        assert!(VersionTable::from_package_json("{ not json").is_err());
        assert!(VersionTable::from_package_json("{}").unwrap().is_empty());
    }
}
