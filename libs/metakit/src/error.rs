use thiserror::Error;

use crate::table::TableError;

/// Errors surfaced by introspection queries.
///
/// "Nothing found" is never an error: queries return empty sequences or `None`.
#[derive(Debug, Error)]
pub enum MetaError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A descriptor refers to a type the table cannot resolve; the member or
    /// supertype list of that type cannot be enumerated.
    #[error("type '{name}' is referenced but has no registered descriptor")]
    UnresolvedType { name: &'static str },

    #[error("type '{0}' has no registered default factory")]
    NotInstantiable(&'static str),

    #[error("the process-wide introspector is already initialized")]
    AlreadyInitialized,

    #[error(transparent)]
    Table(#[from] TableError),
}

impl MetaError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        MetaError::InvalidArgument(msg.into())
    }
}
