//! Error types for Skein Core

use thiserror::Error;

/// Result type alias using Skein's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Skein error types
///
/// Encoding and decoding are all-or-nothing: any of these aborts the whole
/// call and no partial graph is returned.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Value not encodable: {0}")]
    ValueNotEncodable(String),

    #[error("Unregistered type: {0}")]
    UnregisteredType(String),

    #[error("Malformed node at {location}: {reason}")]
    MalformedNode { location: String, reason: String },

    #[error("Dangling reference: no definition for id {0}")]
    DanglingReference(u64),

    #[error("Cycle resolution failure: id {id} ({type_tag}) is referenced before it can be constructed")]
    CycleResolutionFailure { id: u64, type_tag: String },

    #[error("Type already registered: {0}")]
    DuplicateType(String),

    #[error("Invalid type tag: {0}")]
    InvalidTypeTag(#[from] crate::limits::ValidationError),

    #[error("Missing parameter: {0}")]
    MissingParam(String),

    #[error("Invalid parameter {name}: expected {expected}")]
    InvalidParam { name: String, expected: String },

    #[error("Expected a container, got {0}")]
    NotAContainer(&'static str),

    #[error("Nesting depth {depth} exceeds the limit of {max}")]
    NestingTooDeep { depth: usize, max: usize },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn malformed(location: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedNode {
            location: location.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_param(name: impl Into<String>, expected: impl Into<String>) -> Self {
        Self::InvalidParam {
            name: name.into(),
            expected: expected.into(),
        }
    }
}
