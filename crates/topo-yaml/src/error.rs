//! Error types for the YAML document adapter
//!
//! - [`ParseError`]: text could not be turned into a document tree
//! - [`PathError`]: a path walked into a node of the wrong shape

/// Errors while parsing YAML text into a [`Document`](crate::Document)
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// The text is not valid YAML
    #[error("invalid YAML: {0}")]
    Syntax(String),

    /// Valid YAML that the lossless tree cannot represent
    #[error("unsupported YAML construct at line {line}: {message}")]
    Unsupported {
        /// 1-based line number
        line: usize,
        /// What was found
        message: String,
    },
}

impl ParseError {
    /// Create unsupported-construct error for a 0-based line index
    pub(crate) fn unsupported(line_index: usize, message: impl Into<String>) -> Self {
        Self::Unsupported {
            line: line_index + 1,
            message: message.into(),
        }
    }
}

impl From<serde_yaml::Error> for ParseError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Syntax(err.to_string())
    }
}

/// Errors while addressing nodes by path
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    /// Expected a mapping at this path
    #[error("{0} is not a map")]
    NotAMapping(String),

    /// Expected a sequence at this path
    #[error("{0} is not a sequence")]
    NotASequence(String),
}
