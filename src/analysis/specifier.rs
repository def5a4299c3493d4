//! Module specifier classification.
//!
//! A specifier is local when it is relative (`./x`, `../x`, `.`, `..`) or
//! starts with one of the configured prefixes that resolve inside the package
//! root (e.g. `@/components/card`). Everything else names a package.

use std::fmt;

use serde::Serialize;

/// Whether an import refers to a package or to a file of the same project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportKind {
    Package,
    Local,
}

impl fmt::Display for ImportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportKind::Package => write!(f, "package"),
            ImportKind::Local => write!(f, "local"),
        }
    }
}

/// Decides which specifiers stay inside the package root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionTable {
    local_prefixes: Vec<String>,
}

impl ResolutionTable {
    /// Relative paths plus the given prefixes are local.
    pub fn new(local_prefixes: impl IntoIterator<Item = impl Into<String>>) -> Self {
        ResolutionTable {
            local_prefixes: local_prefixes
                .into_iter()
                .map(Into::into)
                .filter(|p: &String| !p.is_empty())
                .collect(),
        }
    }

    /// Only relative paths are local.
    pub fn relative_only() -> Self {
        ResolutionTable {
            local_prefixes: Vec::new(),
        }
    }

    pub fn local_prefixes(&self) -> &[String] {
        &self.local_prefixes
    }

    pub fn is_local(&self, specifier: &str) -> bool {
        is_relative(specifier)
            || self
                .local_prefixes
                .iter()
                .any(|prefix| specifier.starts_with(prefix.as_str()))
    }

    pub fn classify(&self, specifier: &str) -> ImportKind {
        if self.is_local(specifier) {
            ImportKind::Local
        } else {
            ImportKind::Package
        }
    }
}

impl Default for ResolutionTable {
    fn default() -> Self {
        ResolutionTable::new(["@/", "~/"])
    }
}

fn is_relative(specifier: &str) -> bool {
    specifier == "."
        || specifier == ".."
        || specifier.starts_with("./")
        || specifier.starts_with("../")
}

/// A package specifier split into its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageSpecifier<'a> {
    /// Package name, e.g. `@radix-ui/react-slot`
    pub name: &'a str,
    /// Inline version, e.g. `^2.0` in `framer-motion@^2.0/dom`
    pub version_hint: Option<&'a str>,
    /// Subpath after the package name
    pub subpath: Option<&'a str>,
}

impl<'a> PackageSpecifier<'a> {
    /// Split `[@scope/]name[@version][/subpath]`.
    ///
    /// Returns `None` for empty or malformed specifiers such as `@scope` alone.
    pub fn parse(specifier: &'a str) -> Option<Self> {
        let specifier = specifier.trim();
        if specifier.is_empty() {
            return None;
        }

        // Length of the `@scope/` prefix, if scoped
        let scope_len = if specifier.starts_with('@') {
            let slash = specifier.find('/')?;
            if slash <= 1 {
                return None;
            }
            slash + 1
        } else {
            0
        };

        let rest = &specifier[scope_len..];
        let name_end = rest.find(&['@', '/'][..]).unwrap_or(rest.len());
        if name_end == 0 {
            return None;
        }

        let name = &specifier[..scope_len + name_end];
        let tail = &rest[name_end..];

        let (version_hint, subpath) = match tail.strip_prefix('@') {
            Some(versioned) => match versioned.split_once('/') {
                Some((version, sub)) => (Some(version), Some(sub)),
                None => (Some(versioned), None),
            },
            None => (None, tail.strip_prefix('/')),
        };

        Some(PackageSpecifier {
            name,
            version_hint: version_hint.filter(|v| !v.is_empty()),
            subpath: subpath.filter(|s| !s.is_empty()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_paths_are_local() {
        let table = ResolutionTable::relative_only();
        for spec in ["./card", "../lib/utils", ".", ".."] {
            assert_eq!(table.classify(spec), ImportKind::Local, "{}", spec);
        }
        for spec in ["react", "@/components/card", ".hidden", "...x"] {
            assert_eq!(table.classify(spec), ImportKind::Package, "{}", spec);
        }
    }

    #[test]
    fn test_prefixes_are_local() {
        let table = ResolutionTable::default();
        assert!(table.is_local("@/components/ui/card"));
        assert!(table.is_local("~/hooks/use-media"));
        assert!(!table.is_local("@radix-ui/react-slot"));
    }

    #[test]
    fn test_empty_prefix_is_ignored() {
        let table = ResolutionTable::new([""]);
        assert!(!table.is_local("react"));
    }

    #[test]
    fn test_package_specifier_parts() {
        let p = PackageSpecifier::parse("react").unwrap();
        assert_eq!((p.name, p.version_hint, p.subpath), ("react", None, None));

        let p = PackageSpecifier::parse("react-dom/client").unwrap();
        assert_eq!((p.name, p.version_hint, p.subpath), ("react-dom", None, Some("client")));

        let p = PackageSpecifier::parse("@radix-ui/react-slot").unwrap();
        assert_eq!(p.name, "@radix-ui/react-slot");
        assert_eq!(p.subpath, None);

        let p = PackageSpecifier::parse("@tanstack/react-query@^5.0/devtools").unwrap();
        assert_eq!(p.name, "@tanstack/react-query");
        assert_eq!(p.version_hint, Some("^5.0"));
        assert_eq!(p.subpath, Some("devtools"));

        let p = PackageSpecifier::parse("framer-motion@11.0.3").unwrap();
        assert_eq!((p.name, p.version_hint), ("framer-motion", Some("11.0.3")));
    }

    #[test]
    fn test_malformed_package_specifiers() {
        assert!(PackageSpecifier::parse("").is_none());
        assert!(PackageSpecifier::parse("@scope").is_none());
        assert!(PackageSpecifier::parse("@/x").is_none());
        assert!(PackageSpecifier::parse("/abs").is_none());
    }
}
