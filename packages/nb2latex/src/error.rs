//! Error types for nb2latex.
//!
//! Every variant is fatal: the build either merges and compiles all inputs
//! or stops at the first failure. Messages name the document or stage that
//! failed so the binary can report them on a single line.

use thiserror::Error;

/// Main error type for the nb2latex library.
#[derive(Debug, Error)]
pub enum Nb2LatexError {
    /// A converted document has missing or malformed body markers.
    #[error("Cannot find document environment in {document}: {reason}")]
    Structural { document: String, reason: String },

    /// Invalid build input (empty notebook list, unusable title, ...).
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The notebook converter failed for one input.
    #[error("Conversion of {document} failed: {message}{}", output_suffix(.output))]
    Conversion {
        document: String,
        message: String,
        output: String,
    },

    /// The typesetting compiler failed on one of its passes.
    #[error("Compilation pass {pass} failed: {message}{}", output_suffix(.output))]
    Compilation {
        pass: u8,
        message: String,
        output: String,
    },

    /// A required external program could not be found or started.
    #[error("Required tool '{tool}' is not available: {source}")]
    ToolingUnavailable {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Nb2LatexError {
    /// Build a structural error for `document`.
    pub fn structural(document: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Structural {
            document: document.into(),
            reason: reason.into(),
        }
    }
}

/// Render the last non-empty line of captured tool output after the message.
pub(crate) fn output_suffix(output: &str) -> String {
    match output.lines().rev().find(|line| !line.trim().is_empty()) {
        Some(line) => format!(" ({})", line.trim()),
        None => String::new(),
    }
}

/// Result type alias for nb2latex operations.
pub type Result<T> = std::result::Result<T, Nb2LatexError>;
