//! Handshake outcomes and the reasons a connection is refused.

use std::fmt;

use thiserror::Error;

use crate::protocol::ExtensionId;

/// Which end of the connection a peer is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Authoritative host
    Server,
    /// Joining peer
    Client,
}

impl Role {
    /// The other end of the connection
    #[must_use]
    pub const fn peer(self) -> Self {
        match self {
            Self::Server => Self::Client,
            Self::Client => Self::Server,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Server => write!(f, "server"),
            Self::Client => write!(f, "client"),
        }
    }
}

/// One incompatibility between the local extension set and a peer's manifest.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Mismatch {
    /// Peers speak different manifest versions
    #[error("incompatible protocol version: {local} (local) <> {remote} (peer)")]
    IncompatibleProtocol {
        /// Local protocol version
        local: u8,
        /// Version announced by the peer
        remote: u8,
    },

    /// Extensions one side requires are absent on the other
    #[error("{missing_on} missing required extensions: {}", join_ids(.ids))]
    MissingExtensions {
        /// Side lacking the extensions
        missing_on: Role,
        /// Every missing extension
        ids: Vec<ExtensionId>,
    },

    /// Both sides have the extension but the versions are incompatible
    #[error("incompatible extension version: {name} @ {server_version} (server) <> {client_version} (client)")]
    IncompatibleVersion {
        /// Extension name
        name: String,
        /// Version on the server
        server_version: String,
        /// Version on the client
        client_version: String,
    },

    /// A message type of a shared extension is absent on one side
    #[error("{missing_on} missing network message type: {extension} {qualified_name}")]
    MissingMessageType {
        /// Side lacking the type
        missing_on: Role,
        /// Owning extension name
        extension: String,
        /// Qualified type name
        qualified_name: String,
    },

    /// A peer listed the same extension more than once
    #[error("{declared_by} declared extension {name} more than once")]
    DuplicateExtension {
        /// Side that sent the malformed manifest
        declared_by: Role,
        /// Repeated extension name
        name: String,
    },

    /// Server sent an index table that is not dense or overflows
    #[error("invalid message assignment from server: {detail}")]
    InvalidAssignment {
        /// What was wrong
        detail: String,
    },
}

fn join_ids(ids: &[ExtensionId]) -> String {
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

impl Mismatch {
    /// Whether this indicates a broken peer rather than a different extension set.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::InvalidAssignment { .. } | Self::DuplicateExtension { .. })
    }
}

/// Every mismatch found while validating one peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    detected_by: Role,
    mismatches: Vec<Mismatch>,
}

impl Rejection {
    pub(crate) fn new(detected_by: Role, mismatches: Vec<Mismatch>) -> Self {
        debug_assert!(!mismatches.is_empty(), "rejection without a reason");
        Self {
            detected_by,
            mismatches,
        }
    }

    /// Side that ran the validation
    #[must_use]
    pub const fn detected_by(&self) -> Role {
        self.detected_by
    }

    /// Individual mismatches, in discovery order
    #[must_use]
    pub fn mismatches(&self) -> &[Mismatch] {
        &self.mismatches
    }

    /// Single human-readable reason for the host UI
    #[must_use]
    pub fn reason(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, mismatch) in self.mismatches.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{mismatch}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Rejection {}

/// Outcome of validating a peer manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Extension sets agree
    Accepted,
    /// Connection must be refused
    Rejected(Rejection),
}

impl Verdict {
    /// Whether the peer was accepted
    #[must_use]
    pub const fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }

    /// The rejection, if any
    #[must_use]
    pub const fn rejection(&self) -> Option<&Rejection> {
        match self {
            Self::Accepted => None,
            Self::Rejected(rejection) => Some(rejection),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_extensions_enumerated() {
        let mismatch = Mismatch::MissingExtensions {
            missing_on: Role::Client,
            ids: vec![ExtensionId::new("Foo", "1.0"), ExtensionId::new("Bar", "2")],
        };
        assert_eq!(
            mismatch.to_string(),
            "client missing required extensions: Foo@1.0, Bar@2"
        );
    }

    #[test]
    fn test_rejection_reason_joins_all() {
        let rejection = Rejection::new(
            Role::Server,
            vec![
                Mismatch::IncompatibleVersion {
                    name: "Foo".into(),
                    server_version: "1.0".into(),
                    client_version: "2.0".into(),
                },
                Mismatch::MissingMessageType {
                    missing_on: Role::Server,
                    extension: "Bar".into(),
                    qualified_name: "Bar.Sync".into(),
                },
            ],
        );

        assert_eq!(
            rejection.reason(),
            "incompatible extension version: Foo @ 1.0 (server) <> 2.0 (client); \
             server missing network message type: Bar Bar.Sync"
        );
        assert_eq!(rejection.detected_by(), Role::Server);
    }

    #[test]
    fn test_role_peer() {
        assert_eq!(Role::Server.peer(), Role::Client);
        assert_eq!(Role::Client.peer(), Role::Server);
    }
}
