//! Error types for apidiff-core.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for extraction operations.
pub type Result<T> = std::result::Result<T, ExtractError>;

/// Errors that can occur while extracting a package's exported API.
///
/// The differ itself has no failure mode; everything here comes from reading
/// and parsing a package directory or a snapshot file.
#[derive(Error, Debug)]
pub enum ExtractError {
    /// The package directory does not exist.
    ///
    /// Callers map this to "package added" or "package removed" depending on
    /// which side of the comparison is missing.
    #[error("Package not found: {}", path.display())]
    PackageNotFound {
        /// Directory that was searched.
        path: PathBuf,
    },

    /// The directory exists but holds no buildable Go source files.
    #[error("No Go source files in {}", path.display())]
    NoSourceFiles {
        /// Directory that was scanned.
        path: PathBuf,
    },

    /// A source file could not be parsed.
    #[error("Failed to parse {}: {message}", file.display())]
    Parse {
        /// File that failed to parse.
        file: PathBuf,
        /// Description of the parse failure.
        message: String,
    },

    /// A constant declaration has a value shape the extractor does not model.
    #[error("Unhandled constant declaration in {}: {text}", file.display())]
    UnhandledConst {
        /// File containing the declaration.
        file: PathBuf,
        /// Verbatim source text of the const spec.
        text: String,
    },

    /// The Go grammar could not be loaded into the parser.
    #[error("Failed to load Go grammar: {0}")]
    Language(#[from] tree_sitter::LanguageError),

    /// An exclude glob from the configuration is invalid.
    #[error("Invalid exclude pattern '{pattern}': {message}")]
    InvalidPattern {
        /// The offending glob.
        pattern: String,
        /// Description from the glob compiler.
        message: String,
    },

    /// IO error reading sources or snapshots.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Snapshot file is not valid JSON for a `Content`.
    #[error("Invalid snapshot: {0}")]
    Snapshot(#[from] serde_json::Error),
}

impl ExtractError {
    /// Whether this error means the package simply is not there.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ExtractError::PackageNotFound { .. })
    }
}
