//! User-friendly diagnostic messages.
//!
//! Every error surfaced to a submitter or an operator carries the root cause,
//! the entries or paths involved, and a suggested fix.

use std::fmt;
use std::path::PathBuf;

use miette::{Diagnostic as MietteDiagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// Common suggestion messages for consistent error handling.
pub mod suggestions {
    /// Suggestion when a local import has not been linked to an entry.
    pub const LINK_DEPENDENCY: &str =
        "help: Link it with `quay publish <owner/slug> --link <path>=<owner/slug>`";

    /// Suggestion when a referenced entry does not exist.
    pub const ENTRY_NOT_FOUND: &str = "help: Publish the missing entry first, or fix the link";

    /// Suggestion when the store cannot be reached.
    pub const STORE_UNAVAILABLE: &str = "help: The store may be temporarily unavailable; retry";

    /// Suggestion when the demo export cannot be determined.
    pub const DEMO_EXPORT: &str =
        "help: Export exactly one component from the demo, e.g. `export default function Demo()`";

    /// Suggestion when a concurrent edit won.
    pub const CONFLICT: &str = "help: Re-run the command to apply your change on top of the latest revision";
}

/// Severity level for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
    Note,
    Help,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Note => write!(f, "note"),
            Severity::Help => write!(f, "help"),
        }
    }
}

/// A diagnostic message with optional suggestions.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    /// Primary message
    pub message: String,
    /// Severity level
    pub severity: Severity,
    /// Additional context lines
    pub context: Vec<String>,
    /// Suggested fixes
    pub suggestions: Vec<String>,
    /// Related location (file path)
    pub location: Option<PathBuf>,
}

impl Diagnostic {
    /// Create a new error diagnostic.
    pub fn error(message: impl Into<String>) -> Self {
        Diagnostic {
            message: message.into(),
            severity: Severity::Error,
            context: Vec::new(),
            suggestions: Vec::new(),
            location: None,
        }
    }

    /// Create a new warning diagnostic.
    pub fn warning(message: impl Into<String>) -> Self {
        Diagnostic {
            severity: Severity::Warning,
            ..Diagnostic::error(message)
        }
    }

    /// Add context to the diagnostic.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context.push(context.into());
        self
    }

    /// Add a suggestion for fixing the issue.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    /// Add a file location.
    pub fn with_location(mut self, path: impl Into<PathBuf>) -> Self {
        self.location = Some(path.into());
        self
    }

    /// Format the diagnostic for terminal output.
    pub fn format(&self, color: bool) -> String {
        let mut output = String::new();

        let severity_str = if color {
            match self.severity {
                Severity::Error => "\x1b[1;31merror\x1b[0m",
                Severity::Warning => "\x1b[1;33mwarning\x1b[0m",
                Severity::Note => "\x1b[1;36mnote\x1b[0m",
                Severity::Help => "\x1b[1;32mhelp\x1b[0m",
            }
        } else {
            match self.severity {
                Severity::Error => "error",
                Severity::Warning => "warning",
                Severity::Note => "note",
                Severity::Help => "help",
            }
        };

        output.push_str(&format!("{}: {}\n", severity_str, self.message));

        if let Some(ref path) = self.location {
            output.push_str(&format!("  --> {}\n", path.display()));
        }

        for ctx in &self.context {
            output.push_str(&format!("  → {}\n", ctx));
        }

        if !self.suggestions.is_empty() {
            output.push('\n');
            let help_prefix = if color {
                "\x1b[1;32mhelp\x1b[0m"
            } else {
                "help"
            };
            output.push_str(&format!("{}: consider:\n", help_prefix));
            for (i, suggestion) in self.suggestions.iter().enumerate() {
                output.push_str(&format!("  {}. {}\n", i + 1, suggestion));
            }
        }

        output
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format(false))
    }
}

/// Malformed source with its location, for fancy terminal output.
#[derive(Debug, Error, MietteDiagnostic)]
#[error("failed to parse {unit}: {message}")]
#[diagnostic(
    code(quay::analysis::parse),
    help("Only module-level import and export statements are analyzed; check the statement at the marked location")
)]
pub struct ParseDiagnostic {
    pub unit: String,
    pub message: String,
    #[source_code]
    pub src: NamedSource<String>,
    #[label("here")]
    pub span: SourceSpan,
}

impl ParseDiagnostic {
    /// Point at `offset` in the named source.
    pub fn new(
        unit: impl Into<String>,
        message: impl Into<String>,
        name: impl AsRef<str>,
        source: String,
        offset: usize,
    ) -> Self {
        let offset = offset.min(source.len());
        let len = source[offset..]
            .chars()
            .next()
            .map(char::len_utf8)
            .unwrap_or(0);

        ParseDiagnostic {
            unit: unit.into(),
            message: message.into(),
            src: NamedSource::new(name, source),
            span: (offset, len).into(),
        }
    }
}

/// Print a diagnostic to stderr.
pub fn emit(diagnostic: &Diagnostic, color: bool) {
    eprint!("{}", diagnostic.format(color));
}
