//! One-shot installation point for the dispatch hook.

use std::sync::OnceLock;

use tracing::{debug, info};

/// Extension point the host codec consults for every type reference.
///
/// Installing is idempotent: the first hook stays in place for the life of
/// the slot and later installs are ignored.
#[derive(Debug)]
pub struct HookSlot<H> {
    hook: OnceLock<H>,
}

impl<H> Default for HookSlot<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H> HookSlot<H> {
    /// Create an empty slot. Usable in a `static`.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            hook: OnceLock::new(),
        }
    }

    /// Install `hook` unless one is already present. Returns whether it was installed.
    pub fn install(&self, hook: H) -> bool {
        let installed = self.hook.set(hook).is_ok();
        if installed {
            info!("dispatch hook installed");
        } else {
            debug!("dispatch hook already installed; ignoring");
        }
        installed
    }

    /// Install a hook built on demand, returning whichever hook is in place.
    pub fn get_or_install<F>(&self, build: F) -> &H
    where
        F: FnOnce() -> H,
    {
        self.hook.get_or_init(build)
    }

    /// The installed hook
    #[must_use]
    pub fn get(&self) -> Option<&H> {
        self.hook.get()
    }

    /// Whether a hook is installed
    #[must_use]
    pub fn is_installed(&self) -> bool {
        self.hook.get().is_some()
    }
}
