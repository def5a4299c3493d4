//! Registry entries and their source units.
//!
//! A RegistryEntry is the stored metadata for one published component: its
//! identity, pointers to the immutable source units holding its code and demo,
//! and the facts extracted by analysis at the last submission.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::core::EntryId;
use crate::util::hash::sha256_str;

/// Prefix used for registry item types on the wire.
pub const REGISTRY_TYPE_PREFIX: &str = "registry:";

/// A pointer to an immutable blob of source text.
///
/// Units are content addressed: the reference is the SHA-256 of the text, so
/// a unit can never change underneath a reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceUnitRef(String);

impl SourceUnitRef {
    /// Compute the reference for a piece of source text.
    pub fn for_text(text: &str) -> Self {
        SourceUnitRef(sha256_str(text))
    }

    /// Wrap an existing reference string.
    pub fn from_hash(hash: impl Into<String>) -> Self {
        SourceUnitRef(hash.into())
    }

    /// Get the hex digest.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short form for display.
    pub fn short(&self) -> &str {
        &self.0[..self.0.len().min(12)]
    }
}

impl fmt::Display for SourceUnitRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Registry namespace (e.g. `ui`, `hook`, `lib`).
///
/// Rendered on the wire as `registry:<namespace>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Namespace(String);

impl Namespace {
    /// The namespace used when a submission does not specify one.
    pub fn ui() -> Self {
        Namespace("ui".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The wire type, e.g. `registry:ui`.
    pub fn registry_type(&self) -> String {
        format!("{}{}", REGISTRY_TYPE_PREFIX, self.0)
    }
}

impl Default for Namespace {
    fn default() -> Self {
        Namespace::ui()
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Namespace {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let s = s.strip_prefix(REGISTRY_TYPE_PREFIX).unwrap_or(s);

        let valid = s.starts_with(|c: char| c.is_ascii_lowercase())
            && s
                .chars()
                .all(|c| matches!(c, 'a'..='z' | '0'..='9' | '-'));

        if valid {
            Ok(Namespace(s.to_string()))
        } else {
            Err(format!(
                "invalid registry namespace '{}': only [a-z0-9-] allowed, starting with a letter",
                s
            ))
        }
    }
}

impl Serialize for Namespace {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Namespace {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Stored metadata for a published component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryEntry {
    /// Canonical identifier
    pub id: EntryId,

    /// Display name
    pub name: String,

    /// Registry namespace
    #[serde(default)]
    pub namespace: Namespace,

    /// Component source unit
    pub code: SourceUnitRef,

    /// Demo source unit
    pub demo: SourceUnitRef,

    /// Components defined by the code unit, in declaration order
    #[serde(default)]
    pub exported_names: Vec<String>,

    /// Render entry exported by the demo
    #[serde(default)]
    pub demo_export_name: String,

    /// Package name -> version range
    #[serde(default)]
    pub external_dependencies: BTreeMap<String, String>,

    /// Package name -> version range, for the demo only
    #[serde(default)]
    pub demo_external_dependencies: BTreeMap<String, String>,

    /// Local import path -> registry slug (empty while unresolved)
    #[serde(default)]
    pub internal_dependencies: BTreeMap<String, String>,

    /// Monotonic revision used for compare-and-set writes
    #[serde(default)]
    pub revision: u64,
}

impl RegistryEntry {
    /// Create an entry with no analysis facts yet.
    pub fn new(
        id: EntryId,
        name: impl Into<String>,
        namespace: Namespace,
        code: SourceUnitRef,
        demo: SourceUnitRef,
    ) -> Self {
        RegistryEntry {
            id,
            name: name.into(),
            namespace,
            code,
            demo,
            exported_names: Vec::new(),
            demo_export_name: String::new(),
            external_dependencies: BTreeMap::new(),
            demo_external_dependencies: BTreeMap::new(),
            internal_dependencies: BTreeMap::new(),
            revision: 0,
        }
    }

    /// Local import paths that have not been linked to a registry slug yet.
    pub fn unresolved_internal_dependencies(&self) -> Vec<&str> {
        self.internal_dependencies
            .iter()
            .filter(|(_, slug)| slug.trim().is_empty())
            .map(|(path, _)| path.as_str())
            .collect()
    }

    /// An entry is publishable once every internal dependency is resolved.
    pub fn is_publishable(&self) -> bool {
        self.unresolved_internal_dependencies().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry() -> RegistryEntry {
        RegistryEntry::new(
            EntryId::parse("alice/button").unwrap(),
            "Button",
            Namespace::ui(),
            SourceUnitRef::for_text("code"),
            SourceUnitRef::for_text("demo"),
        )
    }

    #[test]
    fn test_source_unit_ref_is_content_addressed() {
        assert_eq!(SourceUnitRef::for_text("a"), SourceUnitRef::for_text("a"));
        assert_ne!(SourceUnitRef::for_text("a"), SourceUnitRef::for_text("b"));
        assert_eq!(SourceUnitRef::for_text("a").short().len(), 12);
    }

    #[test]
    fn test_namespace_parsing() {
        assert_eq!("hook".parse::<Namespace>().unwrap().as_str(), "hook");
        assert_eq!("registry:ui".parse::<Namespace>().unwrap().as_str(), "ui");
        assert_eq!(Namespace::ui().registry_type(), "registry:ui");
        assert!("UI".parse::<Namespace>().is_err());
        assert!("".parse::<Namespace>().is_err());
    }

    #[test]
    fn test_publishable_requires_resolved_slugs() {
        let mut entry = entry();
        assert!(entry.is_publishable());

        entry
            .internal_dependencies
            .insert("./card".to_string(), String::new());
        assert!(!entry.is_publishable());
        assert_eq!(entry.unresolved_internal_dependencies(), vec!["./card"]);

        entry
            .internal_dependencies
            .insert("./card".to_string(), "alice/card".to_string());
        assert!(entry.is_publishable());
    }

    #[test]
    fn test_entry_json_shape() {
        let json = serde_json::to_value(entry()).unwrap();
        assert_eq!(json["id"], "alice/button");
        assert_eq!(json["namespace"], "ui");
        assert_eq!(json["revision"], 0);
    }
}
