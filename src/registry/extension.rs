//! A single loaded extension.

use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Mutex};

use tracing::debug;

use super::lock;
use crate::protocol::{Error, ExtensionId, MessageTypeDescriptor, MessageTypeId, Result};

/// Predicate deciding whether a peer's version string is compatible.
pub type VersionCheck = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// One loaded extension. Extensions are never unloaded; their message list only grows.
pub struct Extension {
    id: ExtensionId,
    slot: u16,
    qualified_names: Arc<Mutex<HashSet<String>>>,
    state: Mutex<ExtensionState>,
}

#[derive(Default)]
struct ExtensionState {
    requires_network: bool,
    version_check: Option<VersionCheck>,
    messages: Vec<MessageTypeDescriptor>,
}

impl Extension {
    pub(crate) fn new(id: ExtensionId, slot: u16, qualified_names: Arc<Mutex<HashSet<String>>>) -> Self {
        Self {
            id,
            slot,
            qualified_names,
            state: Mutex::new(ExtensionState::default()),
        }
    }

    /// Extension identity
    #[must_use]
    pub fn id(&self) -> &ExtensionId {
        &self.id
    }

    /// Position in load order
    #[must_use]
    pub const fn slot(&self) -> u16 {
        self.slot
    }

    /// Whether peers must have this extension installed to connect.
    #[must_use]
    pub fn requires_network(&self) -> bool {
        lock(&self.state).requires_network
    }

    /// Require this extension on both peers even if it registers no message types.
    pub fn set_network_required(&self) {
        lock(&self.state).requires_network = true;
    }

    /// Replace exact version matching with a custom predicate.
    pub fn set_version_check<F>(&self, check: F)
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        lock(&self.state).version_check = Some(Arc::new(check));
    }

    /// Whether a peer running `version` of this extension is compatible.
    #[must_use]
    pub fn is_compatible(&self, version: &str) -> bool {
        // Clone the predicate so user code never runs under our lock.
        let check = lock(&self.state).version_check.clone();
        match check {
            Some(check) => check(version),
            None => version == self.id.version(),
        }
    }

    /// Register a custom network message type and mark the extension network-required.
    ///
    /// Qualified names must be unique across every loaded extension.
    pub fn register_message(&self, qualified_name: impl Into<String>) -> Result<MessageTypeId> {
        let qualified_name = qualified_name.into();
        let mut names = lock(&self.qualified_names);
        if names.contains(&qualified_name) {
            return Err(Error::DuplicateMessageType { qualified_name });
        }

        let mut state = lock(&self.state);
        let ordinal = u16::try_from(state.messages.len()).map_err(|_| Error::TooManyMessageTypes {
            count: state.messages.len() + 1,
            max: u16::MAX as usize,
        })?;
        let id = MessageTypeId::new(self.slot, ordinal);

        debug!(extension = %self.id, %id, name = %qualified_name, "registered network message type");
        names.insert(qualified_name.clone());
        state.messages.push(MessageTypeDescriptor::new(id, qualified_name));
        state.requires_network = true;
        Ok(id)
    }

    /// Registered message types in registration order
    #[must_use]
    pub fn messages(&self) -> Vec<MessageTypeDescriptor> {
        lock(&self.state).messages.clone()
    }

    /// Number of registered message types
    #[must_use]
    pub fn message_count(&self) -> usize {
        lock(&self.state).messages.len()
    }
}

impl fmt::Debug for Extension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = lock(&self.state);
        f.debug_struct("Extension")
            .field("id", &self.id)
            .field("slot", &self.slot)
            .field("requires_network", &state.requires_network)
            .field("custom_version_check", &state.version_check.is_some())
            .field("messages", &state.messages)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extension(name: &str, version: &str) -> Extension {
        Extension::new(ExtensionId::new(name, version), 0, Arc::default())
    }

    #[test]
    fn test_exact_version_by_default() {
        let ext = extension("Foo", "1.0");
        assert!(ext.is_compatible("1.0"));
        assert!(!ext.is_compatible("1.0.1"));
    }

    #[test]
    fn test_custom_version_check() {
        let ext = extension("Foo", "1.2");
        ext.set_version_check(|v| v.starts_with("1."));
        assert!(ext.is_compatible("1.0"));
        assert!(!ext.is_compatible("2.0"));
    }

    #[test]
    fn test_register_message_implies_network() {
        let ext = extension("Foo", "1.0");
        assert!(!ext.requires_network());

        let ping = ext.register_message("Foo.Ping").unwrap();
        let pong = ext.register_message("Foo.Pong").unwrap();

        assert!(ext.requires_network());
        assert_eq!(ping.ordinal(), 0);
        assert_eq!(pong.ordinal(), 1);
        let names: Vec<_> = ext
            .messages()
            .iter()
            .map(|m| m.qualified_name().to_owned())
            .collect();
        assert_eq!(names, ["Foo.Ping", "Foo.Pong"]);
    }

    #[test]
    fn test_duplicate_message_rejected() {
        let ext = extension("Foo", "1.0");
        ext.register_message("Foo.Ping").unwrap();

        let err = ext.register_message("Foo.Ping").unwrap_err();
        assert!(matches!(err, Error::DuplicateMessageType { .. }));
        assert_eq!(ext.message_count(), 1);
    }

    #[test]
    fn test_network_required_without_messages() {
        let ext = extension("Prefabs", "3");
        ext.set_network_required();
        assert!(ext.requires_network());
        assert_eq!(ext.message_count(), 0);
    }
}
