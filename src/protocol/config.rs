//! Handshake configuration.

use super::{MAX_MESSAGE_TYPES, PROTOCOL_VERSION};

/// Knobs shared by the codec and the validator.
#[derive(Debug, Clone)]
pub struct HandshakeConfig {
    /// Manifest format version written by this process and expected from peers.
    pub protocol_version: u8,
    /// Maximum number of custom message types in an index assignment.
    pub max_message_types: usize,
    /// Maximum encoded length of a single string, in bytes. Enforced when
    /// writing and when reading a manifest.
    pub max_string_len: usize,
}

impl Default for HandshakeConfig {
    fn default() -> Self {
        Self {
            protocol_version: PROTOCOL_VERSION,
            max_message_types: MAX_MESSAGE_TYPES,
            max_string_len: u16::MAX as usize,
        }
    }
}

impl HandshakeConfig {
    /// Override the protocol version.
    #[must_use]
    pub const fn with_protocol_version(mut self, version: u8) -> Self {
        self.protocol_version = version;
        self
    }

    /// Override the message type cap. Values above [`MAX_MESSAGE_TYPES`] are clamped.
    #[must_use]
    pub fn with_max_message_types(mut self, max: usize) -> Self {
        self.max_message_types = max.min(MAX_MESSAGE_TYPES);
        self
    }
}
