//! The message registry: owner of the current index assignment.

use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, instrument};

use super::{Assignment, ExtensionCatalog};
use crate::metrics::Metrics;
use crate::protocol::{
    ClientManifest, Error, ExtensionEntry, HandshakeConfig, MessageMapping, MessageTypeDescriptor,
    MessageTypeId, Result, ServerManifest,
};

/// Maps custom message types to dense wire indices.
///
/// One registry exists per process or service; it is handed by reference to
/// the handshake and dispatch layers. The first call to
/// [`ensure_built`](Self::ensure_built) computes the local assignment from the
/// catalog. A client replaces it with the server's assignment after a
/// successful handshake via [`assign_from_peer`](Self::assign_from_peer).
#[derive(Debug)]
pub struct MessageRegistry {
    catalog: Arc<ExtensionCatalog>,
    config: HandshakeConfig,
    // Published whole under the write lock; readers never see a partial table.
    current: RwLock<Option<Arc<Assignment>>>,
}

impl MessageRegistry {
    /// Create a registry over `catalog` with default configuration
    #[must_use]
    pub fn new(catalog: Arc<ExtensionCatalog>) -> Self {
        Self::with_config(catalog, HandshakeConfig::default())
    }

    /// Create a registry with explicit configuration
    #[must_use]
    pub fn with_config(catalog: Arc<ExtensionCatalog>, config: HandshakeConfig) -> Self {
        Self {
            catalog,
            config,
            current: RwLock::new(None),
        }
    }

    /// The extension catalog
    #[must_use]
    pub fn catalog(&self) -> &Arc<ExtensionCatalog> {
        &self.catalog
    }

    /// Handshake configuration
    #[must_use]
    pub const fn config(&self) -> &HandshakeConfig {
        &self.config
    }

    /// Current assignment, if one has been built or adopted
    #[must_use]
    pub fn snapshot(&self) -> Option<Arc<Assignment>> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Build the local assignment on first use and return the current one.
    ///
    /// Indices follow extension load order, then message registration order.
    /// Concurrent callers block until the first one has published the table.
    pub fn ensure_built(&self) -> Result<Arc<Assignment>> {
        if let Some(current) = self.snapshot() {
            return Ok(current);
        }

        let mut slot = self.current.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(current) = slot.as_ref() {
            return Ok(Arc::clone(current));
        }

        let types: Vec<MessageTypeDescriptor> = self
            .catalog
            .network_required()
            .iter()
            .flat_map(|extension| extension.messages())
            .collect();
        self.check_count(types.len())?;

        let assignment = Arc::new(Assignment::from_ordered(types));
        debug!(
            count = assignment.len(),
            fingerprint = format_args!("{:016x}", assignment.fingerprint()),
            "built local message assignment"
        );
        *slot = Some(Arc::clone(&assignment));
        Ok(assignment)
    }

    /// Replace the assignment with one negotiated from a peer, ordered by index.
    #[instrument(level = "debug", skip_all, fields(count = ordered.len()))]
    pub fn assign_from_peer(&self, ordered: Vec<MessageTypeDescriptor>) -> Result<Arc<Assignment>> {
        self.check_count(ordered.len())?;

        let assignment = Arc::new(Assignment::from_ordered(ordered));
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Some(Arc::clone(&assignment));
        Metrics::record_adoption();
        debug!(
            fingerprint = format_args!("{:016x}", assignment.fingerprint()),
            "adopted peer message assignment"
        );
        Ok(assignment)
    }

    /// Wire index of a custom message type
    pub fn index_of(&self, id: MessageTypeId) -> Result<u16> {
        let current = self.snapshot().ok_or(Error::RegistryNotBuilt)?;
        current.index_of(id).ok_or(Error::UnknownMessageType(id))
    }

    /// Custom message type at a wire index
    pub fn type_of(&self, index: u16) -> Result<MessageTypeId> {
        let current = self.snapshot().ok_or(Error::RegistryNotBuilt)?;
        current
            .type_at(index)
            .map(MessageTypeDescriptor::id)
            .ok_or(Error::UnknownCustomIndex {
                index,
                count: current.len(),
            })
    }

    /// Manifest a server sends to joining clients.
    pub fn server_manifest(&self) -> Result<ServerManifest> {
        let assignment = self.ensure_built()?;
        let extensions = self
            .catalog
            .network_required()
            .iter()
            .map(|extension| ExtensionEntry {
                id: extension.id().clone(),
                messages: assignment
                    .iter()
                    .filter(|(_, d)| d.id().extension_slot() == extension.slot())
                    .map(|(index, d)| MessageMapping {
                        index,
                        qualified_name: d.qualified_name().to_owned(),
                    })
                    .collect(),
            })
            .collect();
        Ok(ServerManifest::new(extensions))
    }

    /// Manifest a client sends when joining.
    pub fn client_manifest(&self) -> Result<ClientManifest> {
        self.ensure_built()?;
        let ids = self
            .catalog
            .network_required()
            .iter()
            .map(|extension| extension.id().clone())
            .collect();
        Ok(ClientManifest::new(ids))
    }

    fn check_count(&self, count: usize) -> Result<()> {
        if count > self.config.max_message_types {
            return Err(Error::TooManyMessageTypes {
                count,
                max: self.config.max_message_types,
            });
        }
        Ok(())
    }
}
