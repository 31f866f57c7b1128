//! The process-wide list of loaded extensions.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use tracing::info;

use super::{Extension, lock};
use crate::protocol::{Error, ExtensionId, Result};

/// Append-only list of loaded extensions, in load order.
#[derive(Debug, Default)]
pub struct ExtensionCatalog {
    extensions: Mutex<Vec<Arc<Extension>>>,
    qualified_names: Arc<Mutex<HashSet<String>>>,
}

impl ExtensionCatalog {
    /// Create an empty catalog
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load an extension. Names are unique within a catalog.
    pub fn load(&self, id: ExtensionId) -> Result<Arc<Extension>> {
        let mut extensions = lock(&self.extensions);
        if extensions.iter().any(|e| e.id().name() == id.name()) {
            return Err(Error::DuplicateExtension {
                name: id.name().to_owned(),
            });
        }

        let slot = u16::try_from(extensions.len()).map_err(|_| Error::TooManyRecords {
            count: extensions.len() + 1,
            max: u16::MAX as usize,
        })?;
        info!(extension = %id, slot, "extension loaded");
        let extension = Arc::new(Extension::new(id, slot, Arc::clone(&self.qualified_names)));
        extensions.push(Arc::clone(&extension));
        Ok(extension)
    }

    /// Look an extension up by name
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<Extension>> {
        lock(&self.extensions)
            .iter()
            .find(|e| e.id().name() == name)
            .cloned()
    }

    /// All loaded extensions in load order
    #[must_use]
    pub fn all(&self) -> Vec<Arc<Extension>> {
        lock(&self.extensions).clone()
    }

    /// Extensions peers must share, in load order
    #[must_use]
    pub fn network_required(&self) -> Vec<Arc<Extension>> {
        lock(&self.extensions)
            .iter()
            .filter(|e| e.requires_network())
            .cloned()
            .collect()
    }

    /// Number of loaded extensions
    #[must_use]
    pub fn len(&self) -> usize {
        lock(&self.extensions).len()
    }

    /// Whether nothing is loaded
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
