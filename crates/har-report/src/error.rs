//! Error types for report rendering

use std::path::PathBuf;
use thiserror::Error;

/// Result type for report operations
pub type ReportResult<T> = Result<T, ReportError>;

#[derive(Debug, Error)]
pub enum ReportError {
    /// The embedded template does not compile
    #[error("invalid report template: {message}")]
    SyntaxError { message: String },

    /// Rendering failed
    #[error("failed to render report: {message}")]
    RenderError { message: String },

    /// Writing the rendered report failed
    #[error("failed to write report to {}: {source}", path.display())]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl From<minijinja::Error> for ReportError {
    fn from(err: minijinja::Error) -> Self {
        match err.kind() {
            minijinja::ErrorKind::SyntaxError => ReportError::SyntaxError {
                message: err.to_string(),
            },
            _ => ReportError::RenderError {
                message: err.to_string(),
            },
        }
    }
}
