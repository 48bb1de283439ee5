//! Protocol error types.

use thiserror::Error;

/// Errors that can occur when decoding a TagVal message.
///
/// Every variant is isolated to the single message being decoded; the
/// session logs and discards the message and the connection stays open.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Message shorter than the two-character type code plus one byte.
    #[error("message too small: {actual} bytes")]
    MessageTooSmall {
        /// Length of the offending message.
        actual: usize,
    },

    /// A field key was empty before the end of the message.
    #[error("unexpected end of message")]
    UnexpectedEom,

    /// The two type-code bytes were not valid characters.
    #[error("type code is not valid text")]
    BadTypeCode,

    /// A required field was absent from the decoded field map.
    #[error("key not defined: {0}")]
    KeyNotDefined(String),

    /// A field value could not be parsed as the expected number.
    #[error("field {key} is not numeric: {value:?}")]
    BadNumber {
        /// Field key.
        key: String,
        /// Offending value.
        value: String,
    },
}
