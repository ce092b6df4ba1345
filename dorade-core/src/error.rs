//! Error types for descriptor decoding

use thiserror::Error;

/// Errors that can occur when decoding DORADE descriptors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    /// Buffer is too short to contain the descriptor
    #[error("Descriptor too short: expected at least {expected} bytes, got {actual}")]
    TooShort { expected: usize, actual: usize },

    /// Descriptor tag doesn't match the record being decoded
    #[error("Unexpected descriptor tag: expected {expected:?}, got {actual:?}")]
    UnexpectedTag { expected: String, actual: String },

    /// Declared descriptor size is outside the legal range
    #[error("Invalid descriptor size {size} for {tag:?}")]
    InvalidDescriptorSize { tag: String, size: u32 },

    /// Failed to deserialize descriptor structure
    #[error("Deserialization failed: {0}")]
    DeserializationFailed(String),
}

impl From<bincode::Error> for ParseError {
    fn from(e: bincode::Error) -> Self {
        ParseError::DeserializationFailed(e.to_string())
    }
}
