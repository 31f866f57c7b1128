//! Dense index assignment of custom message types.

use std::collections::HashMap;

use xxhash_rust::xxh3::Xxh3;

use crate::protocol::{MessageTypeDescriptor, MessageTypeId};

/// An immutable `index -> message type` table with indices `0..len`.
#[derive(Debug, Clone)]
pub struct Assignment {
    types: Vec<MessageTypeDescriptor>,
    by_id: HashMap<MessageTypeId, u16>,
    fingerprint: u64,
}

impl Assignment {
    /// Build from descriptors ordered by index.
    ///
    /// Callers bound the length to [`crate::protocol::MAX_MESSAGE_TYPES`], which fits a `u16`.
    pub(crate) fn from_ordered(types: Vec<MessageTypeDescriptor>) -> Self {
        let mut hasher = Xxh3::new();
        let mut by_id = HashMap::with_capacity(types.len());
        for (index, descriptor) in (0u16..).zip(&types) {
            by_id.insert(descriptor.id(), index);
            hasher.update(&index.to_le_bytes());
            hasher.update(descriptor.qualified_name().as_bytes());
            hasher.update(&[0]);
        }

        Self {
            fingerprint: hasher.digest(),
            types,
            by_id,
        }
    }

    /// Index of a message type
    #[must_use]
    pub fn index_of(&self, id: MessageTypeId) -> Option<u16> {
        self.by_id.get(&id).copied()
    }

    /// Message type at an index
    #[must_use]
    pub fn type_at(&self, index: u16) -> Option<&MessageTypeDescriptor> {
        self.types.get(index as usize)
    }

    /// Index of a message type by qualified name
    #[must_use]
    pub fn index_of_name(&self, qualified_name: &str) -> Option<u16> {
        self.types
            .iter()
            .position(|d| d.qualified_name() == qualified_name)
            .and_then(|i| u16::try_from(i).ok())
    }

    /// Descriptors in index order
    pub fn iter(&self) -> impl Iterator<Item = (u16, &MessageTypeDescriptor)> {
        (0u16..).zip(self.types.iter())
    }

    /// Number of assigned types
    #[must_use]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Whether no types are assigned
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// XXH3 digest over `(index, qualified name)` pairs.
    ///
    /// Two peers agree on an assignment exactly when their fingerprints match.
    #[must_use]
    pub const fn fingerprint(&self) -> u64 {
        self.fingerprint
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(slot: u16, ordinal: u16, name: &str) -> MessageTypeDescriptor {
        MessageTypeDescriptor::new(MessageTypeId::new(slot, ordinal), name)
    }

    #[test]
    fn test_lookup_both_ways() {
        let assignment = Assignment::from_ordered(vec![
            descriptor(0, 0, "A.One"),
            descriptor(1, 0, "B.One"),
        ]);

        assert_eq!(assignment.len(), 2);
        assert_eq!(assignment.index_of(MessageTypeId::new(1, 0)), Some(1));
        assert_eq!(assignment.index_of(MessageTypeId::new(2, 0)), None);
        assert_eq!(assignment.type_at(0).unwrap().qualified_name(), "A.One");
        assert!(assignment.type_at(2).is_none());
        assert_eq!(assignment.index_of_name("B.One"), Some(1));
    }

    #[test]
    fn test_fingerprint_tracks_names_and_order() {
        let a = Assignment::from_ordered(vec![descriptor(0, 0, "A"), descriptor(0, 1, "B")]);
        let same = Assignment::from_ordered(vec![descriptor(5, 0, "A"), descriptor(5, 1, "B")]);
        let swapped = Assignment::from_ordered(vec![descriptor(0, 1, "B"), descriptor(0, 0, "A")]);

        assert_eq!(a.fingerprint(), same.fingerprint());
        assert_ne!(a.fingerprint(), swapped.fingerprint());
    }
}
