//! modlink error types

use thiserror::Error;

use super::MessageTypeId;

/// Errors raised by the wire primitives, the registry and the dispatch hook.
///
/// Peer mismatches found during a handshake are not errors; they are reported
/// through [`crate::handshake::Verdict`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Stream ended before a complete value could be read
    #[error("unexpected end of stream: need {needed} bytes, {remaining} remaining")]
    UnexpectedEof {
        /// Bytes required by the read
        needed: usize,
        /// Bytes left in the stream
        remaining: usize,
    },

    /// String bytes were not valid UTF-8
    #[error("invalid UTF-8 in string field")]
    InvalidUtf8,

    /// String too long for its length prefix
    #[error("string too long: {len} bytes (max {max})")]
    StringTooLong {
        /// Encoded length
        len: usize,
        /// Maximum allowed
        max: usize,
    },

    /// Too many records for a u16 count prefix
    #[error("too many records: {count} (max {max})")]
    TooManyRecords {
        /// Record count
        count: usize,
        /// Maximum allowed
        max: usize,
    },

    /// An extension with the same name is already loaded
    #[error("extension already loaded: {name}")]
    DuplicateExtension {
        /// Extension name
        name: String,
    },

    /// A message type with the same qualified name is already registered
    #[error("message type already registered: {qualified_name}")]
    DuplicateMessageType {
        /// Qualified type name
        qualified_name: String,
    },

    /// More custom message types than an assignment can hold
    #[error("too many network message types: {count} (max {max})")]
    TooManyMessageTypes {
        /// Number of types that would be assigned
        count: usize,
        /// Maximum allowed
        max: usize,
    },

    /// Registry queried before an index assignment exists
    #[error("message registry queried before an index assignment was built")]
    RegistryNotBuilt,

    /// Type handle not present in the current assignment
    #[error("message type {0} has no index in the current assignment")]
    UnknownMessageType(MessageTypeId),

    /// Registry index outside the current assignment
    #[error("custom message index {index} out of range (assignment holds {count})")]
    UnknownCustomIndex {
        /// Index read from the wire
        index: u16,
        /// Number of assigned types
        count: usize,
    },

    /// Native type not present in the host table
    #[error("native message type not present in host type table")]
    UnknownNativeType,

    /// Native index not present in the host table
    #[error("native message index {0} not present in host type table")]
    UnknownNativeIndex(u8),

    /// Host table mapped a native type onto the custom tag
    #[error("native message index {0} is reserved for custom types")]
    NativeIndexReserved(u8),

    /// Host type table collides with the custom tag
    #[error("native type table has {len} entries (max {max})")]
    NativeTableTooLarge {
        /// Table length
        len: usize,
        /// Maximum allowed
        max: usize,
    },
}

impl Error {
    /// Whether the error means the stream ran dry rather than carried bad data.
    #[must_use]
    pub const fn is_eof(&self) -> bool {
        matches!(self, Self::UnexpectedEof { .. })
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
