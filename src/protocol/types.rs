//! Identity types for extensions and their message types

use std::fmt;

/// Name and version of a loaded extension.
///
/// The name is the key used to match extensions across peers; the version is
/// opaque unless the extension installs its own compatibility check.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExtensionId {
    name: String,
    version: String,
}

impl ExtensionId {
    /// Create a new identity
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }

    /// Extension name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Extension version
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }
}

impl fmt::Display for ExtensionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.version)
    }
}

/// Process-local handle for a registered custom message type.
///
/// Handles are issued at registration time and never cross the wire; peers
/// match types by qualified name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MessageTypeId(u32);

impl MessageTypeId {
    pub(crate) const fn new(extension_slot: u16, ordinal: u16) -> Self {
        Self(((extension_slot as u32) << 16) | ordinal as u32)
    }

    /// Slot of the owning extension in load order
    #[must_use]
    pub const fn extension_slot(self) -> u16 {
        (self.0 >> 16) as u16
    }

    /// Registration ordinal within the owning extension
    #[must_use]
    pub const fn ordinal(self) -> u16 {
        (self.0 & 0xFFFF) as u16
    }
}

impl fmt::Display for MessageTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}.{}", self.extension_slot(), self.ordinal())
    }
}

/// A registered message type: its local handle plus its wire-stable name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MessageTypeDescriptor {
    id: MessageTypeId,
    qualified_name: String,
}

impl MessageTypeDescriptor {
    pub(crate) fn new(id: MessageTypeId, qualified_name: impl Into<String>) -> Self {
        Self {
            id,
            qualified_name: qualified_name.into(),
        }
    }

    /// Local handle
    #[must_use]
    pub const fn id(&self) -> MessageTypeId {
        self.id
    }

    /// Fully qualified type name
    #[must_use]
    pub fn qualified_name(&self) -> &str {
        &self.qualified_name
    }
}
