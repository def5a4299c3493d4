//! High-level operations.
//!
//! This module contains the pipelines behind quay commands: analyzing a
//! submission, publishing it, and serving manifests.

pub mod manifest;
pub mod publish;
pub mod serve;
pub mod submit;

pub use manifest::{build_manifest, ManifestError, ManifestOptions};
pub use publish::{link_dependency, publish, PublishError, PublishOutcome, PublishRequest};
pub use serve::{resolve_manifest, serve_manifest, ServeError, ServeOptions};
pub use submit::{submit, Submission};
