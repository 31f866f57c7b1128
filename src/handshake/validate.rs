//! Comparison of the local extension set against a peer manifest.
//!
//! Extensions are matched by name so a version difference is reported as such
//! rather than as a missing extension. Message types are matched by qualified
//! name, never by index, because each process numbers its own types until the
//! server's assignment is adopted. Every mismatch found in one pass is
//! reported together.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use tracing::{info, instrument, warn};

use super::{Mismatch, Rejection, Role, Verdict};
use crate::metrics::Metrics;
use crate::protocol::{ClientManifest, ExtensionId, MessageTypeDescriptor, Received, ServerManifest};
use crate::registry::{Extension, MessageRegistry};

fn by_name(extensions: &[Arc<Extension>]) -> HashMap<&str, &Arc<Extension>> {
    extensions.iter().map(|e| (e.id().name(), e)).collect()
}

/// Required extensions never matched by the peer, in load order.
fn unmatched(
    required: &[Arc<Extension>],
    remaining: &HashMap<&str, &Arc<Extension>>,
) -> Option<Vec<ExtensionId>> {
    let ids: Vec<_> = required
        .iter()
        .filter(|e| remaining.contains_key(e.id().name()))
        .map(|e| e.id().clone())
        .collect();
    (!ids.is_empty()).then_some(ids)
}

/// Protocol guard. `Some` ends validation early with that verdict.
///
/// A peer on another manifest version sent no body; that only matters when we
/// require extensions, and then every one of them is reported missing.
fn protocol_guard<M>(
    registry: &MessageRegistry,
    received: &Received<M>,
    local: Role,
    required: &[Arc<Extension>],
) -> Option<Verdict> {
    let version = registry.config().protocol_version;
    if !received.version_mismatch(version) {
        return None;
    }
    if required.is_empty() {
        return Some(finish(local, Vec::new()));
    }

    let mismatches = vec![
        Mismatch::IncompatibleProtocol {
            local: version,
            remote: received.protocol_version,
        },
        Mismatch::MissingExtensions {
            missing_on: local.peer(),
            ids: required.iter().map(|e| e.id().clone()).collect(),
        },
    ];
    Some(finish(local, mismatches))
}

fn finish(local: Role, mismatches: Vec<Mismatch>) -> Verdict {
    let accepted = mismatches.is_empty();
    Metrics::record_verdict(accepted);
    if accepted {
        info!(role = %local, "peer extension set accepted");
        return Verdict::Accepted;
    }

    let rejection = Rejection::new(local, mismatches);
    warn!(role = %local, reason = %rejection, "peer extension set rejected");
    Verdict::Rejected(rejection)
}

/// Server side: validate the identities a joining client declared.
///
/// Never touches the index assignment; the server's own is authoritative.
#[instrument(level = "debug", skip_all, fields(declared = received.manifest.extensions.len()))]
pub fn validate_client_manifest(
    registry: &MessageRegistry,
    received: &Received<ClientManifest>,
) -> Verdict {
    let required = registry.catalog().network_required();
    if let Some(verdict) = protocol_guard(registry, received, Role::Server, &required) {
        return verdict;
    }

    // Peers may name any loaded extension; only network-required ones must be matched.
    let loaded = registry.catalog().all();
    let mut remaining = by_name(&loaded);
    let mut mismatches = Vec::new();
    let mut server_missing = Vec::new();
    let mut seen = HashSet::new();

    for declared in &received.manifest.extensions {
        if !seen.insert(declared.name()) {
            mismatches.push(Mismatch::DuplicateExtension {
                declared_by: Role::Client,
                name: declared.name().to_owned(),
            });
            continue;
        }
        let Some(local) = remaining.remove(declared.name()) else {
            server_missing.push(declared.clone());
            continue;
        };
        if !local.is_compatible(declared.version()) {
            mismatches.push(Mismatch::IncompatibleVersion {
                name: declared.name().to_owned(),
                server_version: local.id().version().to_owned(),
                client_version: declared.version().to_owned(),
            });
        }
    }

    if !server_missing.is_empty() {
        mismatches.push(Mismatch::MissingExtensions {
            missing_on: Role::Server,
            ids: server_missing,
        });
    }
    if let Some(ids) = unmatched(&required, &remaining) {
        mismatches.push(Mismatch::MissingExtensions {
            missing_on: Role::Client,
            ids,
        });
    }

    finish(Role::Server, mismatches)
}

/// Client side: validate the server's extensions and message assignment.
///
/// On acceptance the server's indices replace the local assignment. Nothing is
/// changed when the server is rejected.
#[instrument(level = "debug", skip_all, fields(declared = received.manifest.extensions.len()))]
pub fn validate_server_manifest(
    registry: &MessageRegistry,
    received: &Received<ServerManifest>,
) -> Verdict {
    let required = registry.catalog().network_required();
    if let Some(verdict) = protocol_guard(registry, received, Role::Client, &required) {
        return verdict;
    }

    // Peers may name any loaded extension; only network-required ones must be matched.
    let loaded = registry.catalog().all();
    let mut remaining = by_name(&loaded);
    let mut mismatches = Vec::new();
    let mut client_missing = Vec::new();
    let mut by_index: BTreeMap<u16, MessageTypeDescriptor> = BTreeMap::new();
    let mut seen = HashSet::new();

    for entry in &received.manifest.extensions {
        if !seen.insert(entry.id.name()) {
            mismatches.push(Mismatch::DuplicateExtension {
                declared_by: Role::Server,
                name: entry.id.name().to_owned(),
            });
            continue;
        }
        let Some(local) = remaining.remove(entry.id.name()) else {
            client_missing.push(entry.id.clone());
            continue;
        };
        if !local.is_compatible(entry.id.version()) {
            mismatches.push(Mismatch::IncompatibleVersion {
                name: entry.id.name().to_owned(),
                server_version: entry.id.version().to_owned(),
                client_version: local.id().version().to_owned(),
            });
            continue;
        }

        let mut pending: Vec<Option<MessageTypeDescriptor>> =
            local.messages().into_iter().map(Some).collect();
        for mapping in &entry.messages {
            let found = pending
                .iter_mut()
                .find(|slot| {
                    slot.as_ref()
                        .is_some_and(|d| d.qualified_name() == mapping.qualified_name)
                })
                .and_then(Option::take);
            let Some(descriptor) = found else {
                mismatches.push(Mismatch::MissingMessageType {
                    missing_on: Role::Client,
                    extension: entry.id.name().to_owned(),
                    qualified_name: mapping.qualified_name.clone(),
                });
                continue;
            };
            if by_index.insert(mapping.index, descriptor).is_some() {
                mismatches.push(Mismatch::InvalidAssignment {
                    detail: format!("index {} assigned twice", mapping.index),
                });
            }
        }
        for leftover in pending.into_iter().flatten() {
            mismatches.push(Mismatch::MissingMessageType {
                missing_on: Role::Server,
                extension: entry.id.name().to_owned(),
                qualified_name: leftover.qualified_name().to_owned(),
            });
        }
    }

    if !client_missing.is_empty() {
        mismatches.push(Mismatch::MissingExtensions {
            missing_on: Role::Client,
            ids: client_missing,
        });
    }
    if let Some(ids) = unmatched(&required, &remaining) {
        mismatches.push(Mismatch::MissingExtensions {
            missing_on: Role::Server,
            ids,
        });
    }
    if !mismatches.is_empty() {
        return finish(Role::Client, mismatches);
    }

    let count = by_index.len();
    if let Some((&index, _)) = by_index.iter().find(|(index, _)| usize::from(**index) >= count) {
        return finish(
            Role::Client,
            vec![Mismatch::InvalidAssignment {
                detail: format!("index {index} out of range for {count} message types"),
            }],
        );
    }

    // Keys are unique and all below `count`, so BTreeMap order is exactly 0..count.
    let ordered: Vec<_> = by_index.into_values().collect();
    if let Err(err) = registry.assign_from_peer(ordered) {
        return finish(
            Role::Client,
            vec![Mismatch::InvalidAssignment {
                detail: err.to_string(),
            }],
        );
    }

    finish(Role::Client, Vec::new())
}
