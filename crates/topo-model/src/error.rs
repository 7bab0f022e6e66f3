//! Error types for topology edits
//!
//! Every variant renders a message fit for direct display: the orchestrator
//! forwards `to_string()` unchanged inside a failed `SaveResult`.

/// Failure of a node or link operation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TopologyError {
    /// `topology.nodes` is absent or not a mapping
    #[error("YAML topology nodes is not a map")]
    NodesMalformed,

    /// `topology.links` exists but is not a sequence
    #[error("YAML topology links is not a sequence")]
    LinksMalformed,

    /// Node identifier already taken
    #[error("node \"{0}\" already exists")]
    NodeExists(String),

    /// Node identifier not present
    #[error("node \"{0}\" not found")]
    NodeNotFound(String),

    /// A link with the same canonical key exists
    #[error("link {0} already exists")]
    LinkExists(String),

    /// No link with this canonical key
    #[error("link {0} not found")]
    LinkNotFound(String),

    /// Typed input rejected before touching the document
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl TopologyError {
    /// Create an invalid-input error
    #[inline]
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Identity conflict (duplicate node or link)
    #[inline]
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::NodeExists(_) | Self::LinkExists(_))
    }

    /// Edit or delete target absent
    #[inline]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NodeNotFound(_) | Self::LinkNotFound(_))
    }
}

/// Result type for topology operations
pub type Result<T> = std::result::Result<T, TopologyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_are_displayable() {
        assert_eq!(
            TopologyError::NodeExists("r1".into()).to_string(),
            "node \"r1\" already exists"
        );
        assert_eq!(
            TopologyError::NodesMalformed.to_string(),
            "YAML topology nodes is not a map"
        );
    }

    #[test]
    fn classification() {
        assert!(TopologyError::LinkExists("a|b".into()).is_conflict());
        assert!(TopologyError::NodeNotFound("r1".into()).is_not_found());
        assert!(!TopologyError::LinksMalformed.is_conflict());
    }
}
