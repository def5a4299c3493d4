//! Configuration file support for Quay.
//!
//! Quay supports two configuration file locations:
//! - Global: `~/.quay/config.toml` - User-wide defaults
//! - Project: `.quay/config.toml` - Project-specific overrides
//!
//! Project config takes precedence over global config.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::analysis::versions::LATEST;

/// Quay configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Source analysis settings
    pub analysis: AnalysisConfig,

    /// Dependency resolution settings
    pub resolve: ResolveConfig,

    /// Served manifest settings
    pub manifest: ManifestConfig,

    /// Backing store settings
    pub store: StoreConfig,
}

/// Source analysis configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Specifier prefixes that resolve inside the package root (e.g. `@/`)
    pub local_prefixes: Vec<String>,

    /// Version recorded for packages with no known version
    pub latest_sentinel: String,

    /// `package.json` used as a version source, relative to the project
    pub package_json: Option<PathBuf>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        AnalysisConfig {
            local_prefixes: vec!["@/".to_string(), "~/".to_string()],
            latest_sentinel: LATEST.to_string(),
            package_json: Some(PathBuf::from("package.json")),
        }
    }
}

/// Dependency resolution configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolveConfig {
    /// Deadline for a whole resolution, in milliseconds (None = unbounded)
    pub timeout_ms: Option<u64>,

    /// Fetch each traversal frontier concurrently
    pub parallel: bool,
}

impl Default for ResolveConfig {
    fn default() -> Self {
        ResolveConfig {
            timeout_ms: Some(10_000),
            parallel: true,
        }
    }
}

impl ResolveConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

/// Served manifest configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManifestConfig {
    /// Extension of served file paths
    pub file_extension: String,
}

impl Default for ManifestConfig {
    fn default() -> Self {
        ManifestConfig {
            file_extension: "tsx".to_string(),
        }
    }
}

/// Backing store configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Directory store root, relative to the project
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            path: PathBuf::from(".quay").join("store"),
        }
    }
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Load configuration with fallback to defaults if file doesn't exist.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {}: {:#}", path.display(), e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Merge another config into this one (other takes precedence).
    ///
    /// Fields left at their default value in `other` do not override.
    pub fn merge(&mut self, other: Config) {
        let defaults = Config::default();

        if other.analysis.local_prefixes != defaults.analysis.local_prefixes {
            self.analysis.local_prefixes = other.analysis.local_prefixes;
        }
        if other.analysis.latest_sentinel != defaults.analysis.latest_sentinel {
            self.analysis.latest_sentinel = other.analysis.latest_sentinel;
        }
        if other.analysis.package_json != defaults.analysis.package_json {
            self.analysis.package_json = other.analysis.package_json;
        }

        if other.resolve.timeout_ms != defaults.resolve.timeout_ms {
            self.resolve.timeout_ms = other.resolve.timeout_ms;
        }
        if !other.resolve.parallel {
            self.resolve.parallel = false;
        }

        if other.manifest.file_extension != defaults.manifest.file_extension {
            self.manifest.file_extension = other.manifest.file_extension;
        }

        if other.store.path != defaults.store.path {
            self.store.path = other.store.path;
        }
    }
}

/// Load merged configuration from global and project locations.
///
/// Order of precedence (highest to lowest):
/// 1. Project config (.quay/config.toml)
/// 2. Global config (~/.quay/config.toml)
/// 3. Defaults
pub fn load_config(global_path: &Path, project_path: &Path) -> Config {
    let mut config = Config::default();

    if global_path.exists() {
        let global = Config::load_or_default(global_path);
        config.merge(global);
    }

    if project_path.exists() {
        let project = Config::load_or_default(project_path);
        config.merge(project);
    }

    config
}

/// Get the global quay config directory (~/.quay).
pub fn global_config_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".quay"))
}

/// Get the global config path (~/.quay/config.toml).
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("config.toml"))
}

/// Get the project config path (.quay/config.toml).
pub fn project_config_path(project_root: &Path) -> PathBuf {
    project_root.join(".quay").join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.analysis.local_prefixes, vec!["@/", "~/"]);
        assert_eq!(config.analysis.latest_sentinel, "latest");
        assert!(config.resolve.parallel);
        assert_eq!(config.resolve.timeout(), Some(Duration::from_secs(10)));
        assert_eq!(config.manifest.file_extension, "tsx");
        assert_eq!(config.store.path, PathBuf::from(".quay/store"));
    }

    #[test]
    fn test_config_load() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join("config.toml");

        std::fs::write(
            &config_path,
            r##"
[analysis]
local_prefixes = ["#/"]

[resolve]
timeout_ms = 250
parallel = false

[manifest]
file_extension = "jsx"
"##,
        )
        .unwrap();

        let config = Config::load(&config_path).unwrap();
        assert_eq!(config.analysis.local_prefixes, vec!["#/"]);
        assert_eq!(config.analysis.latest_sentinel, "latest");
        assert_eq!(config.resolve.timeout_ms, Some(250));
        assert!(!config.resolve.parallel);
        assert_eq!(config.manifest.file_extension, "jsx");
    }

    #[test]
    fn test_invalid_config_falls_back_to_defaults() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join("config.toml");
        std::fs::write(&config_path, "[resolve\nparallel = ").unwrap();

        assert_eq!(Config::load_or_default(&config_path), Config::default());
    }

    #[test]
    fn test_load_config_precedence() {
        let tmp = TempDir::new().unwrap();
        let global_path = tmp.path().join("global.toml");
        let project_path = tmp.path().join("project.toml");

        std::fs::write(
            &global_path,
            r#"
[manifest]
file_extension = "jsx"

[store]
path = "/srv/quay"
"#,
        )
        .unwrap();

        std::fs::write(
            &project_path,
            r#"
[manifest]
file_extension = "ts"
"#,
        )
        .unwrap();

        let config = load_config(&global_path, &project_path);

        assert_eq!(config.manifest.file_extension, "ts");
        assert_eq!(config.store.path, PathBuf::from("/srv/quay"));
    }
}
