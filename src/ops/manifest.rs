//! Manifest building - render a ResolvedSet into the served wire format.

use std::collections::HashMap;

use thiserror::Error;

use crate::core::{EntryId, ManifestFile, RegistryManifest};
use crate::resolver::ResolvedSet;
use crate::util::config::ManifestConfig;

/// Options for rendering manifests.
#[derive(Debug, Clone)]
pub struct ManifestOptions {
    /// Extension of generated file paths, without the dot
    pub file_extension: String,
}

impl Default for ManifestOptions {
    fn default() -> Self {
        ManifestOptions {
            file_extension: "tsx".to_string(),
        }
    }
}

impl ManifestOptions {
    pub fn from_config(config: &ManifestConfig) -> Self {
        ManifestOptions {
            file_extension: config.file_extension.trim_start_matches('.').to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ManifestError {
    #[error("cannot build a manifest from an empty resolved set")]
    EmptyResolvedSet,
}

/// Build the manifest for the first seed of `set`.
///
/// Files follow discovery order, so the root comes first. Only the root's
/// external packages are listed; dependencies of linked entries are declared
/// by those entries' own manifests.
pub fn build_manifest(
    set: &ResolvedSet,
    opts: &ManifestOptions,
) -> Result<RegistryManifest, ManifestError> {
    let root = set.root().ok_or(ManifestError::EmptyResolvedSet)?;

    let mut slug_counts: HashMap<&str, usize> = HashMap::new();
    for id in set.ids() {
        *slug_counts.entry(id.slug()).or_default() += 1;
    }

    let files = set
        .iter()
        .map(|resolved| {
            let id = resolved.id();
            let qualified = slug_counts.get(id.slug()).copied().unwrap_or(0) > 1;
            ManifestFile {
                path: file_path(id, qualified, &opts.file_extension),
                content: resolved.source_text.clone(),
                file_type: resolved.namespace().registry_type(),
                target: String::new(),
            }
        })
        .collect();

    Ok(RegistryManifest {
        name: root.id().slug().to_string(),
        item_type: root.namespace().registry_type(),
        dependencies: root.entry.external_dependencies.keys().cloned().collect(),
        files,
    })
}

/// `<slug>.<ext>`, or `<owner>/<slug>.<ext>` when slugs collide.
pub fn file_path(id: &EntryId, qualified: bool, extension: &str) -> String {
    let stem = if qualified {
        format!("{}/{}", id.owner(), id.slug())
    } else {
        id.slug().to_string()
    };

    if extension.is_empty() {
        stem
    } else {
        format!("{}.{}", stem, extension)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::Resolver;
    use crate::test_support::fixtures::{component_source, GraphBuilder};

    #[test]
    fn test_root_dependencies_only() {
        let store = GraphBuilder::new()
            .entry("alice/button", &[("./icon", "alice/icon")])
            .external("alice/button", &[("framer-motion", "latest"), ("clsx", "^2")])
            .entry("alice/icon", &[])
            .external("alice/icon", &[("lucide-react", "latest")])
            .namespace("alice/icon", "lib")
            .build();

        let set = Resolver::new(&store).resolve(&["alice/button"]).unwrap();
        let manifest = build_manifest(&set, &ManifestOptions::default()).unwrap();

        assert_eq!(manifest.name, "button");
        assert_eq!(manifest.item_type, "registry:ui");
        assert_eq!(manifest.dependencies, vec!["clsx", "framer-motion"]);
        assert_eq!(manifest.file_paths(), vec!["button.tsx", "icon.tsx"]);
        assert_eq!(manifest.files[0].content, component_source("Button"));
        assert_eq!(manifest.files[1].file_type, "registry:lib");
        assert!(manifest.files.iter().all(|f| f.target.is_empty()));
    }

    #[test]
    fn test_colliding_slugs_are_qualified() {
        let store = GraphBuilder::new()
            .entry("alice/button", &[("./icon", "alice/icon"), ("./other", "bob/icon")])
            .entry("alice/icon", &[])
            .entry("bob/icon", &[])
            .build();

        let set = Resolver::new(&store).resolve(&["alice/button"]).unwrap();
        let manifest = build_manifest(&set, &ManifestOptions::default()).unwrap();
        assert_eq!(
            manifest.file_paths(),
            vec!["button.tsx", "alice/icon.tsx", "bob/icon.tsx"]
        );
    }

    #[test]
    fn test_empty_set() {
        let set = ResolvedSet::default();
        assert_eq!(
            build_manifest(&set, &ManifestOptions::default()),
            Err(ManifestError::EmptyResolvedSet)
        );
    }

    #[test]
    fn test_extension_from_config() {
        let opts = ManifestOptions::from_config(&ManifestConfig {
            file_extension: ".jsx".to_string(),
        });
        let id = EntryId::parse("alice/card").unwrap();
        assert_eq!(file_path(&id, false, &opts.file_extension), "card.jsx");
        assert_eq!(file_path(&id, true, ""), "alice/card");
    }
}
