//! Global context for Quay operations.
//!
//! Provides centralized access to configuration, paths, and environment.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::util::config::{load_config, project_config_path, Config};

/// Global context containing configuration and paths.
#[derive(Debug, Clone)]
pub struct GlobalContext {
    /// Current working directory
    cwd: PathBuf,

    /// Home directory for global Quay data (~/.quay/)
    home: PathBuf,

    /// Merged global + project configuration
    config: Config,

    /// Whether to use verbose output
    verbose: bool,

    /// Whether to use colors in output
    color: bool,
}

impl GlobalContext {
    /// Create a new GlobalContext rooted at the current directory.
    pub fn new() -> Result<Self> {
        let cwd = std::env::current_dir().context("failed to get current directory")?;
        Ok(Self::with_cwd(cwd))
    }

    /// Create a GlobalContext with a specific working directory.
    pub fn with_cwd(cwd: PathBuf) -> Self {
        let home = crate::util::config::global_config_dir()
            .unwrap_or_else(|| PathBuf::from(".quay"));
        let config = load_config(&home.join("config.toml"), &project_config_path(&cwd));

        GlobalContext {
            cwd,
            home,
            config,
            verbose: false,
            color: true,
        }
    }

    /// Replace the configuration.
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Set verbose mode.
    pub fn set_verbose(&mut self, verbose: bool) {
        self.verbose = verbose;
    }

    /// Set color output.
    pub fn set_color(&mut self, color: bool) {
        self.color = color;
    }

    /// Get the current working directory.
    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    /// Get the Quay home directory (~/.quay/).
    pub fn home(&self) -> &Path {
        &self.home
    }

    /// Get the merged configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get the global configuration file path.
    pub fn config_path(&self) -> PathBuf {
        self.home.join("config.toml")
    }

    /// Get the project-local Quay directory.
    pub fn project_quay_dir(&self) -> PathBuf {
        self.cwd.join(".quay")
    }

    /// Root of the directory store, resolved against the working directory.
    pub fn store_path(&self) -> PathBuf {
        self.resolve_path(&self.config.store.path)
    }

    /// The configured `package.json`, if it exists.
    pub fn package_json_path(&self) -> Option<PathBuf> {
        self.config
            .analysis
            .package_json
            .as_ref()
            .map(|p| self.resolve_path(p))
            .filter(|p| p.is_file())
    }

    /// Check if verbose mode is enabled.
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// Check if color output is enabled.
    pub fn color(&self) -> bool {
        self.color
    }

    fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.cwd.join(path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_project_config_is_loaded() {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir_all(tmp.path().join(".quay")).unwrap();
        std::fs::write(
            tmp.path().join(".quay/config.toml"),
            "[store]\npath = \"registry-data\"\n",
        )
        .unwrap();

        let ctx = GlobalContext::with_cwd(tmp.path().to_path_buf());
        assert_eq!(ctx.store_path(), tmp.path().join("registry-data"));
        assert_eq!(ctx.project_quay_dir(), tmp.path().join(".quay"));
    }

    #[test]
    fn test_package_json_only_when_present() {
        let tmp = TempDir::new().unwrap();
        let ctx = GlobalContext::with_cwd(tmp.path().to_path_buf());
        assert!(ctx.package_json_path().is_none());

        std::fs::write(tmp.path().join("package.json"), "{}").unwrap();
        assert_eq!(ctx.package_json_path(), Some(tmp.path().join("package.json")));
    }
}
