//! Error types for the orchestrator
//!
//! These never cross the public API: every mutating call folds them into a
//! failed `SaveResult`.

use std::path::PathBuf;
use topo_annotations::AnnotationError;
use topo_model::TopologyError;
use topo_yaml::ParseError;

/// Orchestrator failure
#[derive(Debug, thiserror::Error)]
pub enum IoError {
    /// Topology file is not valid YAML
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        /// Topology file
        path: PathBuf,
        /// Parser error
        #[source]
        source: ParseError,
    },

    /// Node or link operation rejected
    #[error(transparent)]
    Topology(#[from] TopologyError),

    /// Annotation sidecar failure
    #[error(transparent)]
    Annotation(#[from] AnnotationError),

    /// Topology file read or write failed
    #[error("I/O failed for {}: {source}", path.display())]
    Io {
        /// Topology file
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
}

impl IoError {
    /// Create an I/O error for a path
    #[inline]
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Storage failure (topology or sidecar)
    #[inline]
    #[must_use]
    pub fn is_storage(&self) -> bool {
        matches!(self, Self::Io { .. } | Self::Annotation(_))
    }
}

/// Result type for orchestrator internals
pub type Result<T> = std::result::Result<T, IoError>;
