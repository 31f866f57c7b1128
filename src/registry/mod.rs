//! Loaded extensions and the index assignment of their network message types.

mod assignment;
mod catalog;
mod extension;
mod registry;

pub use assignment::Assignment;
pub use catalog::ExtensionCatalog;
pub use extension::{Extension, VersionCheck};
pub use registry::MessageRegistry;

use std::sync::{Mutex, MutexGuard, PoisonError};

// A panic while holding one of these locks cannot leave the guarded data
// half-updated, so poisoning is ignored.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
