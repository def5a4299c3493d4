//! Resolution error types and diagnostics.

use std::fmt;

use thiserror::Error;

use crate::core::EntryId;
use crate::sources::StoreError;
use crate::util::diagnostic::{suggestions, Diagnostic};

/// Why a dependency could not be produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotFoundCause {
    /// No entry with this identifier exists
    MissingEntry,
    /// The entry exists but its code unit does not
    MissingSource,
    /// The reference is not a valid `owner/slug` (or is still unlinked)
    InvalidReference,
    /// The resolution deadline passed before the entry was fetched
    TimedOut,
}

impl fmt::Display for NotFoundCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotFoundCause::MissingEntry => write!(f, "no such entry"),
            NotFoundCause::MissingSource => write!(f, "source unit missing"),
            NotFoundCause::InvalidReference => write!(f, "invalid reference"),
            NotFoundCause::TimedOut => write!(f, "timed out"),
        }
    }
}

/// Error during dependency resolution. No partial result accompanies it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("dependency not found: `{id}` ({cause})")]
    DependencyNotFound {
        id: String,
        required_by: Option<EntryId>,
        cause: NotFoundCause,
    },

    #[error("backing store unavailable: {message}")]
    BackingStoreUnavailable { message: String },
}

impl ResolveError {
    pub(crate) fn not_found(
        id: impl Into<String>,
        required_by: Option<&EntryId>,
        cause: NotFoundCause,
    ) -> Self {
        ResolveError::DependencyNotFound {
            id: id.into(),
            required_by: required_by.cloned(),
            cause,
        }
    }

    /// Map a store failure while fetching `id`.
    pub(crate) fn from_store(err: StoreError, id: &EntryId, required_by: Option<&EntryId>) -> Self {
        match err {
            StoreError::EntryNotFound(_) => {
                ResolveError::not_found(id.to_string(), required_by, NotFoundCause::MissingEntry)
            }
            StoreError::SourceNotFound(_) => {
                ResolveError::not_found(id.to_string(), required_by, NotFoundCause::MissingSource)
            }
            other => ResolveError::BackingStoreUnavailable {
                message: other.to_string(),
            },
        }
    }

    /// Transient failures that are safe to retry with backoff.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ResolveError::BackingStoreUnavailable { .. }
                | ResolveError::DependencyNotFound {
                    cause: NotFoundCause::TimedOut,
                    ..
                }
        )
    }

    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            ResolveError::DependencyNotFound {
                id,
                required_by,
                cause,
            } => {
                let mut diag =
                    Diagnostic::error(format!("could not resolve registry entry `{}`", id));

                diag = diag.with_context(format!("reason: {}", cause));
                if let Some(parent) = required_by {
                    diag = diag.with_context(format!("required by `{}`", parent));
                }

                match cause {
                    NotFoundCause::TimedOut => diag.with_suggestion(suggestions::STORE_UNAVAILABLE),
                    NotFoundCause::InvalidReference => {
                        diag.with_suggestion(suggestions::LINK_DEPENDENCY)
                    }
                    _ => diag.with_suggestion(suggestions::ENTRY_NOT_FOUND),
                }
            }

            ResolveError::BackingStoreUnavailable { message } => {
                Diagnostic::error("registry store is unavailable")
                    .with_context(message.clone())
                    .with_suggestion(suggestions::STORE_UNAVAILABLE)
            }
        }
    }
}
