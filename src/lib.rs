//! modlink - custom network message types for independently authored extensions
//!
//! Extensions ("mods") loaded into a multiplayer host register their own
//! network message types. Client and server may run different extension sets,
//! so while a peer joins both sides exchange a manifest and either agree on
//! one numbering of every custom message type, or refuse the connection with a
//! reason naming each mismatch.
//!
//! # Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use modlink::handshake::{ClientHandshake, Rejection, ServerHandshake};
//! use modlink::protocol::ExtensionId;
//! use modlink::registry::{ExtensionCatalog, MessageRegistry};
//!
//! fn node() -> MessageRegistry {
//!     let catalog = Arc::new(ExtensionCatalog::new());
//!     let foo = catalog.load(ExtensionId::new("Foo", "1.0")).unwrap();
//!     foo.register_message("Foo.Ping").unwrap();
//!     MessageRegistry::new(catalog)
//! }
//!
//! let (server, client) = (node(), node());
//! let server_leg = ServerHandshake::new(&server);
//! let client_leg = ClientHandshake::new(&client);
//!
//! let mut request = Vec::new();
//! server_leg.write_manifest(&mut request)?;
//! let received = client_leg.read_manifest(&mut request.as_slice());
//! let verdict = client_leg.verify(&received, &mut |r: &Rejection| eprintln!("{r}"));
//! assert!(verdict.is_accepted());
//! # Ok::<(), modlink::Error>(())
//! ```
//!
//! # Layout
//!
//! - [`protocol`] - stream primitives, manifests and errors
//! - [`registry`] - loaded extensions and the index assignment
//! - [`handshake`] - manifest validation on both sides of a join
//! - [`dispatch`] - per-message type references after the handshake

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::module_name_repetitions)]

pub mod dispatch;
pub mod handshake;
pub mod metrics;
pub mod protocol;
pub mod registry;

pub use dispatch::{DispatchHook, HookSlot, MessageKind, NativeTypeTable};
pub use handshake::{ClientHandshake, Rejection, ServerHandshake, Verdict};
pub use protocol::{Error, ExtensionId, MessageTypeId, PROTOCOL_VERSION, Result};
pub use registry::{Extension, ExtensionCatalog, MessageRegistry};

/// modlink crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
