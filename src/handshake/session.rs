//! Glue between the host's join handshake and the validator.
//!
//! The host appends our manifest to its own verify messages and hands us the
//! trailing bytes of the peer's. On rejection the host's callback tears the
//! connection attempt down and shows the reason; if the transport can carry a
//! rejection notice the callback should send the reason to the peer too.

use tracing::{Span, debug, info_span};
use uuid::Uuid;

use super::{Rejection, Role, Verdict, validate_client_manifest, validate_server_manifest};
use crate::protocol::{ClientManifest, Result, Received, ServerManifest, WireRead, WireWrite};
use crate::registry::MessageRegistry;

/// Host callback invoked once when a connection attempt is refused.
pub trait RejectionSink {
    /// Abort the attempt and surface `rejection` to the user or the peer.
    fn reject(&mut self, rejection: &Rejection);
}

impl<F> RejectionSink for F
where
    F: FnMut(&Rejection),
{
    fn reject(&mut self, rejection: &Rejection) {
        self(rejection);
    }
}

fn session_span(id: Uuid, role: Role) -> Span {
    info_span!("handshake", %id, %role)
}

fn conclude<S: RejectionSink>(verdict: Verdict, sink: &mut S) -> Verdict {
    if let Verdict::Rejected(rejection) = &verdict {
        sink.reject(rejection);
    }
    verdict
}

/// Server leg of one joining client's handshake.
#[derive(Debug)]
pub struct ServerHandshake<'a> {
    id: Uuid,
    registry: &'a MessageRegistry,
    span: Span,
}

impl<'a> ServerHandshake<'a> {
    /// Start a handshake for a newly connecting client
    #[must_use]
    pub fn new(registry: &'a MessageRegistry) -> Self {
        let id = Uuid::new_v4();
        Self {
            id,
            registry,
            span: session_span(id, Role::Server),
        }
    }

    /// Correlation id recorded in this handshake's log span
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// Append the server manifest to the outgoing verify request.
    pub fn write_manifest<W: WireWrite>(&self, writer: &mut W) -> Result<()> {
        let _enter = self.span.enter();
        let manifest = self.registry.server_manifest()?;
        debug!(
            extensions = manifest.extensions.len(),
            messages = manifest.message_count(),
            "writing server manifest"
        );
        manifest.encode(writer, self.registry.config())
    }

    /// Read the manifest trailing the client's verify reply.
    pub fn read_manifest<R: WireRead>(&self, reader: &mut R) -> Received<ClientManifest> {
        let _enter = self.span.enter();
        ClientManifest::decode(reader, self.registry.config())
    }

    /// Validate the client, invoking `sink` if it must be refused.
    pub fn verify<S: RejectionSink>(&self, received: &Received<ClientManifest>, sink: &mut S) -> Verdict {
        let _enter = self.span.enter();
        conclude(validate_client_manifest(self.registry, received), sink)
    }
}

/// Client leg of a join handshake.
#[derive(Debug)]
pub struct ClientHandshake<'a> {
    id: Uuid,
    registry: &'a MessageRegistry,
    span: Span,
}

impl<'a> ClientHandshake<'a> {
    /// Start a handshake towards a server
    #[must_use]
    pub fn new(registry: &'a MessageRegistry) -> Self {
        let id = Uuid::new_v4();
        Self {
            id,
            registry,
            span: session_span(id, Role::Client),
        }
    }

    /// Correlation id recorded in this handshake's log span
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// Append the client manifest to the outgoing verify reply.
    pub fn write_manifest<W: WireWrite>(&self, writer: &mut W) -> Result<()> {
        let _enter = self.span.enter();
        let manifest = self.registry.client_manifest()?;
        debug!(extensions = manifest.extensions.len(), "writing client manifest");
        manifest.encode(writer, self.registry.config())
    }

    /// Read the manifest trailing the server's verify request.
    pub fn read_manifest<R: WireRead>(&self, reader: &mut R) -> Received<ServerManifest> {
        let _enter = self.span.enter();
        ServerManifest::decode(reader, self.registry.config())
    }

    /// Validate the server and adopt its indices, invoking `sink` if it must be refused.
    pub fn verify<S: RejectionSink>(&self, received: &Received<ServerManifest>, sink: &mut S) -> Verdict {
        let _enter = self.span.enter();
        conclude(validate_server_manifest(self.registry, received), sink)
    }
}
