//! Error types for the annotation sidecar

use std::path::PathBuf;

/// Failure reading or writing an annotation sidecar
#[derive(Debug, thiserror::Error)]
pub enum AnnotationError {
    /// Storage read or write failed
    #[error("annotation I/O failed for {}: {source}", path.display())]
    Io {
        /// Sidecar path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Sidecar content is not valid annotation JSON
    #[error("invalid annotation file {}: {source}", path.display())]
    Json {
        /// Sidecar path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: serde_json::Error,
    },
}

impl AnnotationError {
    /// Create an I/O error for a path
    #[inline]
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a JSON error for a path
    #[inline]
    pub fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.into(),
            source,
        }
    }
}

/// Result type for annotation operations
pub type Result<T> = std::result::Result<T, AnnotationError>;
