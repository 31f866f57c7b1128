//! Per-message type-reference dispatch between host and extension types.

mod hook;
mod install;

pub use hook::{DispatchHook, MessageKind, NativeTypeTable};
pub use install::HookSlot;
