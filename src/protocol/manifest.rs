//! Extension manifests exchanged while a peer joins.
//!
//! # Wire Format
//!
//! Server to client:
//!
//! ```text
//! u8  protocol_version
//! u16 extension_count
//! repeat extension_count:
//!   string name
//!   string version
//!   u16 message_count
//!   repeat message_count:
//!     u16    index
//!     string qualified_name
//! ```
//!
//! Client to server carries only the identities:
//!
//! ```text
//! u8  protocol_version
//! u16 extension_count
//! repeat extension_count:
//!   string name
//!   string version
//! ```

use tracing::warn;

use crate::metrics::Metrics;

use super::{Error, ExtensionId, HandshakeConfig, Result, WireRead, WireWrite};

/// Counts come from the peer; never reserve more than this up front.
const PREALLOC_LIMIT: usize = 64;

fn capacity_for(count: u16) -> usize {
    usize::from(count).min(PREALLOC_LIMIT)
}

/// One `{index, qualified_name}` pair of a server assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MessageMapping {
    /// Registry index assigned by the server
    pub index: u16,
    /// Fully qualified type name
    pub qualified_name: String,
}

/// An extension as described by the server, with its message assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExtensionEntry {
    /// Extension identity
    pub id: ExtensionId,
    /// Message types in registration order
    pub messages: Vec<MessageMapping>,
}

/// Manifest sent by the server; authoritative for indices.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ServerManifest {
    /// Network-required extensions in load order
    pub extensions: Vec<ExtensionEntry>,
}

/// Manifest sent by a joining client.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ClientManifest {
    /// Network-required extensions in load order
    pub extensions: Vec<ExtensionId>,
}

/// A decoded manifest together with the protocol version the peer announced.
///
/// `protocol_version` is `0` when the peer sent nothing at all. A manifest is
/// left empty when the version differs from ours or the stream was cut short;
/// the validator uses the version to tell those cases apart from a peer with
/// no extensions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Received<M> {
    /// Version byte read from the peer, or `0` if absent
    pub protocol_version: u8,
    /// Decoded manifest body
    pub manifest: M,
}

impl<M: Default> Received<M> {
    fn empty(protocol_version: u8) -> Self {
        Self {
            protocol_version,
            manifest: M::default(),
        }
    }
}

impl<M> Received<M> {
    /// Whether the peer announced a version different from `local`.
    #[must_use]
    pub fn version_mismatch(&self, local: u8) -> bool {
        self.protocol_version != 0 && self.protocol_version != local
    }
}

fn write_count<W: WireWrite>(writer: &mut W, count: usize) -> Result<()> {
    let count = u16::try_from(count).map_err(|_| Error::TooManyRecords {
        count,
        max: u16::MAX as usize,
    })?;
    writer.write_u16(count)
}

fn write_bounded<W: WireWrite>(writer: &mut W, value: &str, config: &HandshakeConfig) -> Result<()> {
    if value.len() > config.max_string_len {
        return Err(Error::StringTooLong {
            len: value.len(),
            max: config.max_string_len,
        });
    }
    writer.write_string(value)
}

fn write_id<W: WireWrite>(writer: &mut W, id: &ExtensionId, config: &HandshakeConfig) -> Result<()> {
    write_bounded(writer, id.name(), config)?;
    write_bounded(writer, id.version(), config)
}

fn read_bounded<R: WireRead>(reader: &mut R, config: &HandshakeConfig) -> Result<String> {
    let value = reader.read_string()?;
    if value.len() > config.max_string_len {
        return Err(Error::StringTooLong {
            len: value.len(),
            max: config.max_string_len,
        });
    }
    Ok(value)
}

fn read_id<R: WireRead>(reader: &mut R, config: &HandshakeConfig) -> Result<ExtensionId> {
    let name = read_bounded(reader, config)?;
    let version = read_bounded(reader, config)?;
    Ok(ExtensionId::new(name, version))
}

/// Shared decode path: version guard, then body, folding failures into an empty manifest.
fn decode_with<R, M, F>(reader: &mut R, config: &HandshakeConfig, what: &str, body: F) -> Received<M>
where
    R: WireRead,
    M: Default,
    F: FnOnce(&mut R) -> Result<M>,
{
    let protocol_version = match reader.read_u8() {
        Ok(version) => version,
        Err(err) => {
            warn!(manifest = what, error = %err, "peer sent no manifest; treating as empty");
            Metrics::record_empty_manifest();
            return Received::empty(0);
        }
    };

    if protocol_version != config.protocol_version {
        warn!(
            manifest = what,
            local = config.protocol_version,
            remote = protocol_version,
            "manifest protocol version mismatch; skipping body"
        );
        Metrics::record_empty_manifest();
        return Received::empty(protocol_version);
    }

    match body(reader) {
        Ok(manifest) => Received {
            protocol_version,
            manifest,
        },
        Err(err) => {
            warn!(manifest = what, error = %err, "manifest body unreadable; treating as empty");
            Metrics::record_empty_manifest();
            Received::empty(protocol_version)
        }
    }
}

impl ServerManifest {
    /// Create a manifest from extension entries
    #[must_use]
    pub fn new(extensions: Vec<ExtensionEntry>) -> Self {
        Self { extensions }
    }

    /// Total number of message mappings across all extensions
    #[must_use]
    pub fn message_count(&self) -> usize {
        self.extensions.iter().map(|e| e.messages.len()).sum()
    }

    /// Encode the version byte and the manifest body
    pub fn encode<W: WireWrite>(&self, writer: &mut W, config: &HandshakeConfig) -> Result<()> {
        writer.write_u8(config.protocol_version)?;
        write_count(writer, self.extensions.len())?;
        for entry in &self.extensions {
            write_id(writer, &entry.id, config)?;
            write_count(writer, entry.messages.len())?;
            for mapping in &entry.messages {
                writer.write_u16(mapping.index)?;
                write_bounded(writer, &mapping.qualified_name, config)?;
            }
        }
        Ok(())
    }

    /// Decode a manifest, never failing; see [`Received`].
    pub fn decode<R: WireRead>(reader: &mut R, config: &HandshakeConfig) -> Received<Self> {
        decode_with(reader, config, "server", |reader| {
            let count = reader.read_u16()?;
            let mut extensions = Vec::with_capacity(capacity_for(count));
            for _ in 0..count {
                let id = read_id(reader, config)?;
                let message_count = reader.read_u16()?;
                let mut messages = Vec::with_capacity(capacity_for(message_count));
                for _ in 0..message_count {
                    let index = reader.read_u16()?;
                    let qualified_name = read_bounded(reader, config)?;
                    messages.push(MessageMapping {
                        index,
                        qualified_name,
                    });
                }
                extensions.push(ExtensionEntry { id, messages });
            }
            Ok(Self { extensions })
        })
    }
}

impl ClientManifest {
    /// Create a manifest from extension identities
    #[must_use]
    pub fn new(extensions: Vec<ExtensionId>) -> Self {
        Self { extensions }
    }

    /// Encode the version byte and the manifest body
    pub fn encode<W: WireWrite>(&self, writer: &mut W, config: &HandshakeConfig) -> Result<()> {
        writer.write_u8(config.protocol_version)?;
        write_count(writer, self.extensions.len())?;
        for id in &self.extensions {
            write_id(writer, id, config)?;
        }
        Ok(())
    }

    /// Decode a manifest, never failing; see [`Received`].
    pub fn decode<R: WireRead>(reader: &mut R, config: &HandshakeConfig) -> Received<Self> {
        decode_with(reader, config, "client", |reader| {
            let count = reader.read_u16()?;
            let mut extensions = Vec::with_capacity(capacity_for(count));
            for _ in 0..count {
                extensions.push(read_id(reader, config)?);
            }
            Ok(Self { extensions })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_server() -> ServerManifest {
        ServerManifest::new(vec![
            ExtensionEntry {
                id: ExtensionId::new("Foo", "1.0"),
                messages: vec![
                    MessageMapping {
                        index: 0,
                        qualified_name: "Foo.Ping".into(),
                    },
                    MessageMapping {
                        index: 1,
                        qualified_name: "Foo.Pong".into(),
                    },
                ],
            },
            ExtensionEntry {
                id: ExtensionId::new("Bar", "0.3.1"),
                messages: Vec::new(),
            },
        ])
    }

    #[test]
    fn test_server_manifest_layout() {
        let manifest = ServerManifest::new(vec![ExtensionEntry {
            id: ExtensionId::new("A", "1"),
            messages: vec![MessageMapping {
                index: 3,
                qualified_name: "A.B".into(),
            }],
        }]);
        let mut out = Vec::new();
        manifest.encode(&mut out, &HandshakeConfig::default()).unwrap();

        #[rustfmt::skip]
        let expected = [
            1,                  // protocol version
            1, 0,               // extension count
            1, 0, b'A',         // name
            1, 0, b'1',         // version
            1, 0,               // message count
            3, 0,               // index
            3, 0, b'A', b'.', b'B',
        ];
        assert_eq!(out, expected);
    }

    #[test]
    fn test_server_manifest_roundtrip() {
        let config = HandshakeConfig::default();
        let manifest = sample_server();
        let mut out = Vec::new();
        manifest.encode(&mut out, &config).unwrap();

        let received = ServerManifest::decode(&mut out.as_slice(), &config);
        assert_eq!(received.protocol_version, 1);
        assert_eq!(received.manifest, manifest);
        assert_eq!(received.manifest.message_count(), 2);
    }

    #[test]
    fn test_client_manifest_roundtrip() {
        let config = HandshakeConfig::default();
        let manifest = ClientManifest::new(vec![
            ExtensionId::new("Foo", "1.0"),
            ExtensionId::new("Bar", "2.0"),
        ]);
        let mut out = Vec::new();
        manifest.encode(&mut out, &config).unwrap();

        let received = ClientManifest::decode(&mut out.as_slice(), &config);
        assert_eq!(received.protocol_version, 1);
        assert_eq!(received.manifest, manifest);
    }

    #[test]
    fn test_version_mismatch_skips_body() {
        let config = HandshakeConfig::default();
        let bytes = [2u8];
        let mut input = &bytes[..];

        let received = ServerManifest::decode(&mut input, &config);
        assert_eq!(received.protocol_version, 2);
        assert!(received.manifest.extensions.is_empty());
        assert!(received.version_mismatch(1));
    }

    #[test]
    fn test_version_mismatch_for_any_body() {
        struct Opaque;

        let newer = Received {
            protocol_version: 2,
            manifest: Opaque,
        };
        assert!(newer.version_mismatch(1));
        assert!(!newer.version_mismatch(2));
    }

    #[test]
    fn test_missing_manifest_is_empty() {
        let config = HandshakeConfig::default();
        let mut input: &[u8] = &[];

        let received = ClientManifest::decode(&mut input, &config);
        assert_eq!(received.protocol_version, 0);
        assert!(received.manifest.extensions.is_empty());
        assert!(!received.version_mismatch(1));
    }

    #[test]
    fn test_truncated_body_is_empty() {
        let config = HandshakeConfig::default();
        let mut out = Vec::new();
        sample_server().encode(&mut out, &config).unwrap();
        out.truncate(out.len() - 3);

        let received = ServerManifest::decode(&mut out.as_slice(), &config);
        assert_eq!(received.protocol_version, 1);
        assert!(received.manifest.extensions.is_empty());
    }

    #[test]
    fn test_string_limit_enforced() {
        let config = HandshakeConfig {
            max_string_len: 4,
            ..HandshakeConfig::default()
        };
        let manifest = ClientManifest::new(vec![ExtensionId::new("LongName", "1")]);
        let mut out = Vec::new();

        let err = manifest.encode(&mut out, &config).unwrap_err();
        assert_eq!(err, Error::StringTooLong { len: 8, max: 4 });
    }

    #[test]
    fn test_decode_enforces_string_limit() {
        let mut out = Vec::new();
        ClientManifest::new(vec![ExtensionId::new("LongName", "1")])
            .encode(&mut out, &HandshakeConfig::default())
            .unwrap();

        let strict = HandshakeConfig {
            max_string_len: 4,
            ..HandshakeConfig::default()
        };
        let received = ClientManifest::decode(&mut out.as_slice(), &strict);
        assert_eq!(received.protocol_version, 1);
        assert!(received.manifest.extensions.is_empty());
    }

    #[test]
    fn test_inflated_count_is_empty() {
        let config = HandshakeConfig::default();
        let bytes = [1u8, 0xFF, 0xFF];

        let received = ServerManifest::decode(&mut &bytes[..], &config);
        assert_eq!(received.protocol_version, 1);
        assert!(received.manifest.extensions.is_empty());
        assert_eq!(capacity_for(u16::MAX), PREALLOC_LIMIT);
        assert_eq!(capacity_for(3), 3);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        fn entry_strategy() -> impl Strategy<Value = ExtensionEntry> {
            (
                "[A-Za-z][A-Za-z0-9_]{0,15}",
                "[0-9]{1,2}\\.[0-9]{1,2}",
                prop::collection::vec((any::<u16>(), "[A-Za-z.]{1,24}"), 0..6),
            )
                .prop_map(|(name, version, messages)| ExtensionEntry {
                    id: ExtensionId::new(name, version),
                    messages: messages
                        .into_iter()
                        .map(|(index, qualified_name)| MessageMapping {
                            index,
                            qualified_name,
                        })
                        .collect(),
                })
        }

        proptest! {
            /// Property: server manifests reproduce every (name, version, index, name) tuple
            #[test]
            fn prop_server_manifest_roundtrip(
                entries in prop::collection::vec(entry_strategy(), 0..8),
            ) {
                let config = HandshakeConfig::default();
                let manifest = ServerManifest::new(entries);
                let mut out = Vec::new();
                manifest.encode(&mut out, &config).unwrap();

                let received = ServerManifest::decode(&mut out.as_slice(), &config);
                prop_assert_eq!(received.protocol_version, config.protocol_version);
                prop_assert_eq!(received.manifest, manifest);
            }

            /// Property: cutting a server manifest short never yields a partial manifest
            #[test]
            fn prop_truncation_yields_empty(
                entries in prop::collection::vec(entry_strategy(), 1..4),
                cut in 1usize..64,
            ) {
                let config = HandshakeConfig::default();
                let mut out = Vec::new();
                ServerManifest::new(entries).encode(&mut out, &config).unwrap();
                let keep = out.len().saturating_sub(cut);
                out.truncate(keep);

                let received = ServerManifest::decode(&mut out.as_slice(), &config);
                prop_assert!(received.manifest.extensions.is_empty());
            }
        }
    }
}
