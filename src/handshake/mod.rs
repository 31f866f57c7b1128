//! Extension-compatibility handshake run once while a peer joins.
//!
//! The client sends the identities of its network-required extensions; the
//! server sends identities plus its authoritative message index table. Each
//! side validates what it received and either accepts, or refuses with a
//! [`Rejection`] listing every mismatch.

mod session;
mod validate;
mod verdict;

pub use session::{ClientHandshake, RejectionSink, ServerHandshake};
pub use validate::{validate_client_manifest, validate_server_manifest};
pub use verdict::{Mismatch, Rejection, Role, Verdict};
