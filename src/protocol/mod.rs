//! Wire-level building blocks shared by the registry, handshake and dispatch layers.
//!
//! This module provides the stream primitives, the two manifest shapes exchanged
//! while a peer joins, and the error type used across the crate.

mod config;
mod error;
mod manifest;
mod types;
mod wire;

pub use config::HandshakeConfig;
pub use error::{Error, Result};
pub use manifest::{ClientManifest, ExtensionEntry, MessageMapping, Received, ServerManifest};
pub use types::{ExtensionId, MessageTypeDescriptor, MessageTypeId};
pub use wire::{WireRead, WireWrite};

/// Version of the manifest format. Peers reporting anything else send no manifest body.
pub const PROTOCOL_VERSION: u8 = 1;

/// Tag byte announcing that a registry index follows a type reference.
pub const CUSTOM_TYPE_TAG: u8 = 255;

/// Upper bound on custom message types in one assignment.
///
/// Kept below the custom tag so an index always fits the single-byte fast path.
pub const MAX_MESSAGE_TYPES: usize = 254;

/// Largest native type table the dispatch tag byte can address (indices `0..=254`).
pub const MAX_NATIVE_TYPES: usize = CUSTOM_TYPE_TAG as usize;
