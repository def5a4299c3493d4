//! Served registry manifest - the installer-facing wire format.
//!
//! Field names and nesting are part of the installer contract:
//!
//! ```json
//! {
//!   "name": "button",
//!   "type": "registry:ui",
//!   "dependencies": ["framer-motion"],
//!   "files": [
//!     { "path": "button.tsx", "content": "...", "type": "registry:ui", "target": "" }
//!   ]
//! }
//! ```

use serde::{Deserialize, Serialize};

/// A flattened, installable description of an entry and everything it needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryManifest {
    /// Root entry slug
    pub name: String,

    /// `registry:<namespace>` of the root entry
    #[serde(rename = "type")]
    pub item_type: String,

    /// External package names of the root entry (no versions)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<String>,

    /// One file per resolved entry
    pub files: Vec<ManifestFile>,
}

/// A single file in a served manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestFile {
    pub path: String,
    pub content: String,
    #[serde(rename = "type")]
    pub file_type: String,
    #[serde(default)]
    pub target: String,
}

impl RegistryManifest {
    /// Render to the JSON served to installers.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Paths of all files, in manifest order.
    pub fn file_paths(&self) -> Vec<&str> {
        self.files.iter().map(|f| f.path.as_str()).collect()
    }
}
