//! Error types for archive loading

use std::path::PathBuf;
use thiserror::Error;

/// Result type for archive operations
pub type ArchiveResult<T> = Result<T, ArchiveError>;

/// Errors that can occur while reading a HAR file
///
/// `origin` is the file path, or `<string>` for in-memory input.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// Failed to read the archive file
    #[error("failed to read archive {}: {source}", path.display())]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The content is not JSON, or not HAR-shaped JSON
    #[error("failed to parse archive {origin}: {source}")]
    ParseJson {
        origin: String,
        #[source]
        source: serde_json::Error,
    },

    /// Top-level `log` object is absent
    #[error("archive {origin} has no 'log' object")]
    MissingLog { origin: String },
}
