//! Serving manifests - the installer-facing read path.
//!
//! Each request resolves afresh against the store and renders the result.
//! Failures are returned whole, never as a partially populated manifest.

use thiserror::Error;
use tracing::debug;

use crate::core::{EntryId, RegistryManifest};
use crate::ops::manifest::{build_manifest, ManifestError, ManifestOptions};
use crate::resolver::{ResolveError, ResolveOptions, Resolver};
use crate::sources::BackingStore;
use crate::util::config::Config;

#[derive(Debug, Error)]
pub enum ServeError {
    #[error("invalid registry identifier `{0}`")]
    InvalidId(String),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error("failed to render manifest: {0}")]
    Render(#[from] serde_json::Error),
}

impl ServeError {
    /// HTTP status for the serving boundary.
    pub fn status_code(&self) -> u16 {
        match self {
            ServeError::InvalidId(_) => 404,
            ServeError::Resolve(ResolveError::DependencyNotFound { .. }) => 404,
            ServeError::Resolve(ResolveError::BackingStoreUnavailable { .. }) => 503,
            ServeError::Manifest(_) | ServeError::Render(_) => 500,
        }
    }

    /// Whether a client may retry the same request.
    pub fn is_retryable(&self) -> bool {
        match self {
            ServeError::Resolve(err) => err.is_retryable(),
            _ => false,
        }
    }
}

/// Resolution and rendering options for the read path.
#[derive(Debug, Clone, Default)]
pub struct ServeOptions {
    pub resolve: ResolveOptions,
    pub manifest: ManifestOptions,
}

impl ServeOptions {
    pub fn from_config(config: &Config) -> Self {
        ServeOptions {
            resolve: ResolveOptions::from_config(&config.resolve),
            manifest: ManifestOptions::from_config(&config.manifest),
        }
    }
}

/// Resolve `seeds` and build the manifest of the first one.
pub fn resolve_manifest<S, T>(
    store: &S,
    seeds: &[T],
    opts: &ServeOptions,
) -> Result<RegistryManifest, ServeError>
where
    S: BackingStore + ?Sized,
    T: AsRef<str>,
{
    let set = Resolver::new(store)
        .with_options(opts.resolve.clone())
        .resolve(seeds)?;
    Ok(build_manifest(&set, &opts.manifest)?)
}

/// Serve the manifest of `owner/slug` as JSON text.
pub fn serve_manifest<S: BackingStore + ?Sized>(
    store: &S,
    owner: &str,
    slug: &str,
    opts: &ServeOptions,
) -> Result<String, ServeError> {
    let id = EntryId::new(owner, slug).map_err(|_| ServeError::InvalidId(format!("{}/{}", owner, slug)))?;
    let manifest = resolve_manifest(store, &[id.to_string()], opts)?;

    debug!(%id, files = manifest.files.len(), "serving manifest");
    Ok(manifest.to_json()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::StoreError;
    use crate::test_support::assertions::assert_manifest_paths;
    use crate::test_support::fixtures::{CountingStore, GraphBuilder};

    #[test]
    fn test_serve_button_with_icon() {
        let store = GraphBuilder::new()
            .entry("alice/button", &[("./icon", "icon")])
            .external("alice/button", &[("framer-motion", "latest")])
            .entry("alice/icon", &[])
            .build();

        let json = serve_manifest(&store, "alice", "button", &ServeOptions::default()).unwrap();
        assert_manifest_paths(&json, &["button.tsx", "icon.tsx"]);

        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["name"], "button");
        assert_eq!(value["type"], "registry:ui");
        assert_eq!(value["dependencies"], serde_json::json!(["framer-motion"]));
    }

    #[test]
    fn test_output_is_reproducible() {
        let store = GraphBuilder::new()
            .entry("bob/page", &[("./b", "bob/b"), ("./a", "bob/a")])
            .entry("bob/a", &[("./b", "bob/b")])
            .entry("bob/b", &[])
            .build();

        let first = serve_manifest(&store, "bob", "page", &ServeOptions::default()).unwrap();
        let second = serve_manifest(&store, "bob", "page", &ServeOptions::default()).unwrap();
        assert_eq!(first, second);
        assert!(!first.contains("\"dependencies\""));
    }

    #[test]
    fn test_missing_dependency_is_404_without_manifest() {
        let store = GraphBuilder::new()
            .entry("alice/button", &[("./icon", "alice/icon")])
            .build();

        let err = serve_manifest(&store, "alice", "button", &ServeOptions::default()).unwrap_err();
        assert_eq!(err.status_code(), 404);
        assert!(!err.is_retryable());

        let err = serve_manifest(&store, "alice", "../etc", &ServeOptions::default()).unwrap_err();
        assert!(matches!(err, ServeError::InvalidId(_)));
        assert_eq!(err.status_code(), 404);
    }

    #[test]
    fn test_unavailable_store_is_503() {
        let store = GraphBuilder::new().entry("alice/a", &[]).build();
        let failing = CountingStore::new(&store).failing_with(StoreError::Unavailable("down".into()));

        let err = serve_manifest(&failing, "alice", "a", &ServeOptions::default()).unwrap_err();
        assert_eq!(err.status_code(), 503);
        assert!(err.is_retryable());
    }
}
