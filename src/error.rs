use crate::{parser, schema::RelationshipKind};

/// Everything that can abort a compilation. Each variant other than the
///  parse and length errors names the identifier that was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("parse error: {0}")]
    Parse(#[from] parser::Error),

    #[error("invalid function '{0}'")]
    InvalidFunction(String),

    #[error("invalid attribute '{0}'")]
    InvalidAttribute(String),

    #[error("invalid relationship '{0}'")]
    InvalidRelationship(String),

    #[error("relationship '{relationship}' is of the wrong type ({kind})")]
    RelationshipTypeMismatch {
        relationship: String,
        kind: RelationshipKind,
    },

    #[error("expression is {length} bytes long, the limit is {max_length}")]
    ExpressionTooLong { length: usize, max_length: usize },
}

impl Error {
    /// The function, attribute or relationship name that caused the error.
    pub fn identifier(&self) -> Option<&str> {
        match self {
            Self::InvalidFunction(name)
            | Self::InvalidAttribute(name)
            | Self::InvalidRelationship(name)
            | Self::RelationshipTypeMismatch {
                relationship: name, ..
            } => Some(name.as_str()),
            Self::Parse(_) | Self::ExpressionTooLong { .. } => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
