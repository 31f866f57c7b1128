//! Type-reference codec used for every message after the handshake.
//!
//! # Wire Format
//!
//! ```text
//! u8  tag            0-254 = native index, 255 = custom
//! u16 custom_index   present only when tag == 255
//! ```

use std::fmt;
use std::sync::Arc;

use tracing::trace;

use crate::metrics::{Direction, Metrics};
use crate::protocol::{
    CUSTOM_TYPE_TAG, Error, MAX_NATIVE_TYPES, MessageTypeId, Result, WireRead, WireWrite,
};
use crate::registry::MessageRegistry;

/// The host's own message type table.
pub trait NativeTypeTable {
    /// Host type handle
    type Type: Copy + Eq + fmt::Debug;

    /// Index of a native type
    fn index_of(&self, ty: Self::Type) -> Option<u8>;

    /// Native type at an index
    fn type_at(&self, index: u8) -> Option<Self::Type>;

    /// Number of native types
    fn len(&self) -> usize;

    /// Whether the table is empty
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A message type as seen by the host codec: built in, or contributed by an extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind<N> {
    /// Host type
    Native(N),
    /// Extension type
    Custom(MessageTypeId),
}

impl<N> MessageKind<N> {
    /// Whether this is an extension type
    #[must_use]
    pub const fn is_custom(&self) -> bool {
        matches!(self, Self::Custom(_))
    }
}

/// Routes type references through the registry or the host table.
#[derive(Debug)]
pub struct DispatchHook<T> {
    registry: Arc<MessageRegistry>,
    natives: T,
}

impl<T: NativeTypeTable> DispatchHook<T> {
    /// Create a hook. The host table must leave the custom tag free.
    pub fn new(registry: Arc<MessageRegistry>, natives: T) -> Result<Self> {
        if natives.len() > MAX_NATIVE_TYPES {
            return Err(Error::NativeTableTooLarge {
                len: natives.len(),
                max: MAX_NATIVE_TYPES,
            });
        }
        Ok(Self { registry, natives })
    }

    /// The registry backing custom types
    #[must_use]
    pub fn registry(&self) -> &Arc<MessageRegistry> {
        &self.registry
    }

    /// Write a type reference.
    pub fn write_type<W: WireWrite>(&self, writer: &mut W, kind: MessageKind<T::Type>) -> Result<()> {
        match kind {
            MessageKind::Native(ty) => {
                let index = self.natives.index_of(ty).ok_or(Error::UnknownNativeType)?;
                if index == CUSTOM_TYPE_TAG {
                    return Err(Error::NativeIndexReserved(index));
                }
                trace!(index, "write native type");
                writer.write_u8(index)?;
                Metrics::record_type_reference(Direction::Written, false);
            }
            MessageKind::Custom(id) => {
                let index = self.registry.index_of(id)?;
                trace!(%id, index, "write custom type");
                writer.write_u8(CUSTOM_TYPE_TAG)?;
                writer.write_u16(index)?;
                Metrics::record_type_reference(Direction::Written, true);
            }
        }
        Ok(())
    }

    /// Read a type reference.
    pub fn read_type<R: WireRead>(&self, reader: &mut R) -> Result<MessageKind<T::Type>> {
        let tag = reader.read_u8()?;
        if tag != CUSTOM_TYPE_TAG {
            let ty = self
                .natives
                .type_at(tag)
                .ok_or(Error::UnknownNativeIndex(tag))?;
            trace!(index = tag, "read native type");
            Metrics::record_type_reference(Direction::Read, false);
            return Ok(MessageKind::Native(ty));
        }

        let index = reader.read_u16()?;
        let id = self.registry.type_of(index)?;
        trace!(%id, index, "read custom type");
        Metrics::record_type_reference(Direction::Read, true);
        Ok(MessageKind::Custom(id))
    }

    /// Inbound allow-list: extension types the registry knows are always
    /// permitted; native types defer to the host's own decision.
    pub fn permits_inbound<F>(&self, kind: MessageKind<T::Type>, host_allows: F) -> bool
    where
        F: FnOnce(T::Type) -> bool,
    {
        match kind {
            MessageKind::Native(ty) => host_allows(ty),
            MessageKind::Custom(id) => self.registry.index_of(id).is_ok(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ExtensionId;
    use crate::registry::ExtensionCatalog;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Host {
        Handshake,
        Chat,
        Move,
    }

    #[derive(Debug)]
    struct HostTable;

    impl NativeTypeTable for HostTable {
        type Type = Host;

        fn index_of(&self, ty: Host) -> Option<u8> {
            Some(ty as u8)
        }

        fn type_at(&self, index: u8) -> Option<Host> {
            [Host::Handshake, Host::Chat, Host::Move].get(index as usize).copied()
        }

        fn len(&self) -> usize {
            3
        }
    }

    #[derive(Debug)]
    struct Oversized;

    impl NativeTypeTable for Oversized {
        type Type = u8;

        fn index_of(&self, ty: u8) -> Option<u8> {
            Some(ty)
        }

        fn type_at(&self, index: u8) -> Option<u8> {
            Some(index)
        }

        fn len(&self) -> usize {
            256
        }
    }

    #[derive(Debug)]
    struct Sparse;

    impl NativeTypeTable for Sparse {
        type Type = u8;

        fn index_of(&self, ty: u8) -> Option<u8> {
            (ty == 7).then_some(CUSTOM_TYPE_TAG)
        }

        fn type_at(&self, index: u8) -> Option<u8> {
            (index == CUSTOM_TYPE_TAG).then_some(7)
        }

        fn len(&self) -> usize {
            1
        }
    }

    fn hook() -> (DispatchHook<HostTable>, MessageTypeId, MessageTypeId) {
        let catalog = Arc::new(ExtensionCatalog::new());
        let foo = catalog.load(ExtensionId::new("Foo", "1.0")).unwrap();
        let ping = foo.register_message("Foo.Ping").unwrap();
        let pong = foo.register_message("Foo.Pong").unwrap();
        let registry = Arc::new(MessageRegistry::new(catalog));
        registry.ensure_built().unwrap();
        (DispatchHook::new(registry, HostTable).unwrap(), ping, pong)
    }

    #[test]
    fn test_native_roundtrip() {
        let (hook, _, _) = hook();
        let mut out = Vec::new();
        hook.write_type(&mut out, MessageKind::Native(Host::Move)).unwrap();
        assert_eq!(out, [2]);

        let read = hook.read_type(&mut out.as_slice()).unwrap();
        assert_eq!(read, MessageKind::Native(Host::Move));
    }

    #[test]
    fn test_custom_roundtrip() {
        let (hook, _, pong) = hook();
        let mut out = Vec::new();
        hook.write_type(&mut out, MessageKind::Custom(pong)).unwrap();
        assert_eq!(out, [CUSTOM_TYPE_TAG, 1, 0]);

        let read = hook.read_type(&mut out.as_slice()).unwrap();
        assert_eq!(read, MessageKind::Custom(pong));
    }

    #[test]
    fn test_unknown_indices() {
        let (hook, _, _) = hook();
        assert_eq!(
            hook.read_type(&mut &[9u8][..]).unwrap_err(),
            Error::UnknownNativeIndex(9)
        );
        assert_eq!(
            hook.read_type(&mut &[CUSTOM_TYPE_TAG, 40, 0][..]).unwrap_err(),
            Error::UnknownCustomIndex { index: 40, count: 2 }
        );
        assert!(hook.read_type(&mut &[CUSTOM_TYPE_TAG, 1][..]).unwrap_err().is_eof());
    }

    #[test]
    fn test_write_before_build_fails() {
        let catalog = Arc::new(ExtensionCatalog::new());
        let foo = catalog.load(ExtensionId::new("Foo", "1.0")).unwrap();
        let ping = foo.register_message("Foo.Ping").unwrap();
        let hook = DispatchHook::new(Arc::new(MessageRegistry::new(catalog)), HostTable).unwrap();

        let mut out = Vec::new();
        assert_eq!(
            hook.write_type(&mut out, MessageKind::Custom(ping)),
            Err(Error::RegistryNotBuilt)
        );
        assert!(out.is_empty());
    }

    #[test]
    fn test_permits_inbound() {
        let (hook, ping, _) = hook();
        let host_allows = |ty: Host| ty == Host::Handshake;

        assert!(hook.permits_inbound(MessageKind::Native(Host::Handshake), host_allows));
        assert!(!hook.permits_inbound(MessageKind::Native(Host::Chat), host_allows));
        assert!(hook.permits_inbound(MessageKind::Custom(ping), host_allows));
        assert!(!hook.permits_inbound(MessageKind::Custom(MessageTypeId::new(7, 0)), host_allows));
    }

    #[test]
    fn test_oversized_native_table_refused() {
        let registry = Arc::new(MessageRegistry::new(Arc::new(ExtensionCatalog::new())));
        let err = DispatchHook::new(registry, Oversized).unwrap_err();
        assert_eq!(err, Error::NativeTableTooLarge { len: 256, max: 255 });
    }

    #[test]
    fn test_native_index_on_custom_tag_refused() {
        let registry = Arc::new(MessageRegistry::new(Arc::new(ExtensionCatalog::new())));
        let hook = DispatchHook::new(registry, Sparse).unwrap();

        let mut out = Vec::new();
        assert_eq!(
            hook.write_type(&mut out, MessageKind::Native(7)),
            Err(Error::NativeIndexReserved(CUSTOM_TYPE_TAG))
        );
        assert!(out.is_empty());
    }
}
