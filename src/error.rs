//! Error types for the tracking-plan-gen crate.

use std::path::PathBuf;

/// Errors that can occur while loading, analyzing, or emitting schemas.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An extraction path did not resolve against an unflattened schema.
    ///
    /// Recoverable: the analyzer decides whether to drop the schema or keep
    /// the unfiltered tree.
    #[error("path '{path}' not found (failed at segment '{segment}')")]
    PathNotFound { path: String, segment: String },

    /// The extraction configuration is invalid.
    #[error("invalid configuration: {0}")]
    ConfigValidation(String),

    /// Failed to read a file from disk.
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to write a generated document.
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    /// JSON parse error with context.
    #[error("failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parse or render error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Analysis error. Not produced by the current analyzer; kept so callers
    /// can wrap analysis failures without an API change.
    #[error("analysis error: {0}")]
    Analysis(String),
}

impl Error {
    /// Whether the error is a path resolution failure the caller may recover from.
    pub fn is_path_not_found(&self) -> bool {
        matches!(self, Error::PathNotFound { .. })
    }
}

/// Convenience alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
