//! Entry identification - WHICH registry entry (owner + slug).
//!
//! An EntryId is the canonical `owner/slug` key used everywhere an entry is
//! addressed: store lookups, internal dependency values, resolved sets and
//! served manifests.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Error produced when an identifier is not a valid `owner/slug` pair.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EntryIdError {
    #[error("registry identifier cannot be empty")]
    Empty,

    #[error("invalid registry identifier '{0}': expected `owner/slug`")]
    MissingOwner(String),

    #[error("invalid {part} '{value}': only [A-Za-z0-9_.-] allowed, found '{found}'")]
    InvalidChar {
        part: &'static str,
        value: String,
        found: char,
    },

    #[error("invalid {part} '{value}': must start with an ASCII letter or digit")]
    InvalidStart { part: &'static str, value: String },
}

/// A unique identifier for a registry entry.
///
/// Ordering is lexicographic on `(owner, slug)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryId {
    owner: String,
    slug: String,
}

impl EntryId {
    /// Create a new entry ID, validating both halves.
    pub fn new(owner: impl Into<String>, slug: impl Into<String>) -> Result<Self, EntryIdError> {
        let owner = owner.into();
        let slug = slug.into();
        validate_part("owner", &owner)?;
        validate_part("slug", &slug)?;
        Ok(EntryId { owner, slug })
    }

    /// Parse a canonical `owner/slug` string.
    pub fn parse(s: &str) -> Result<Self, EntryIdError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(EntryIdError::Empty);
        }

        match s.split_once('/') {
            Some((owner, slug)) => EntryId::new(owner, slug),
            None => Err(EntryIdError::MissingOwner(s.to_string())),
        }
    }

    /// Parse an internal dependency value.
    ///
    /// Values are either a full `owner/slug` or a bare `slug`, which is
    /// resolved relative to `default_owner` (the owner of the declaring entry).
    pub fn parse_relative(value: &str, default_owner: &str) -> Result<Self, EntryIdError> {
        let value = value.trim();
        if value.is_empty() {
            return Err(EntryIdError::Empty);
        }

        if value.contains('/') {
            EntryId::parse(value)
        } else {
            EntryId::new(default_owner, value)
        }
    }

    /// Get the owner.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Get the slug.
    pub fn slug(&self) -> &str {
        &self.slug
    }
}

fn validate_part(part: &'static str, value: &str) -> Result<(), EntryIdError> {
    let Some(first) = value.chars().next() else {
        return Err(EntryIdError::Empty);
    };

    if !first.is_ascii_alphanumeric() {
        return Err(EntryIdError::InvalidStart {
            part,
            value: value.to_string(),
        });
    }

    if let Some(found) = value
        .chars()
        .find(|c| !matches!(c, 'a'..='z' | 'A'..='Z' | '0'..='9' | '_' | '-' | '.'))
    {
        return Err(EntryIdError::InvalidChar {
            part,
            value: value.to_string(),
            found,
        });
    }

    Ok(())
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.slug)
    }
}

impl FromStr for EntryId {
    type Err = EntryIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EntryId::parse(s)
    }
}

impl Serialize for EntryId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for EntryId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        EntryId::parse(&s).map_err(serde::de::Error::custom)
    }
}
