//! Boundary to the secure-transport implementation.
//!
//! # Responsibilities
//! - Describe what the server needs from a transport: host key parsing and
//!   a handshake over a raw byte stream
//! - Define the values a completed handshake yields (connection handle,
//!   permissions, channel offers, global requests)
//!
//! # Data Flow
//! ```text
//! raw socket (BoxedStream)
//!     → Transport::handshake(io, &HandshakeConfig)
//!     → Handshake {
//!           conn:        Box<dyn ServerConn>      (close on teardown)
//!           permissions: Option<Permissions>
//!           channels:    Receiver<Box<dyn NewChannel>>
//!           requests:    Receiver<IncomingRequest> (global)
//!       }
//! ```
//!
//! # Design Decisions
//! - Key exchange, encryption and wire encoding live entirely behind
//!   [`Transport`]; this crate only consumes its results
//! - Streams are boxed so connections, channels and the logging decorator
//!   share one type

mod request;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;

use crate::error::{ChannelError, HandshakeError, KeyError};

pub use request::{IncomingRequest, RequestReply};

/// Any duplex byte stream usable as a raw connection or a logical channel.
pub trait DuplexStream: AsyncRead + AsyncWrite + Send + Unpin + 'static {}

impl<T> DuplexStream for T where T: AsyncRead + AsyncWrite + Send + Unpin + 'static {}

/// A type-erased duplex stream.
pub type BoxedStream = Box<dyn DuplexStream>;

/// A secure transport able to authenticate raw connections.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Parsed private host key.
    type HostKey: Send + Sync + 'static;

    /// Parse raw private key bytes into a host key.
    fn parse_host_key(&self, raw: &[u8]) -> Result<Self::HostKey, KeyError>;

    /// Run the server side of the handshake over `io`.
    ///
    /// On failure the transport owns and drops `io`.
    async fn handshake(
        &self,
        io: BoxedStream,
        config: &HandshakeConfig<Self::HostKey>,
    ) -> Result<Handshake, HandshakeError>;
}

/// Handle to an authenticated connection, used to tear it down.
#[async_trait]
pub trait ServerConn: Send {
    /// Close the underlying raw connection.
    async fn close(&mut self) -> std::io::Result<()>;
}

/// A logical channel the client asked to open.
#[async_trait]
pub trait NewChannel: Send + 'static {
    /// Declared channel type, e.g. `"session"`.
    fn channel_type(&self) -> &str;

    /// Accept the channel, yielding its stream and its request stream.
    async fn accept(self: Box<Self>) -> Result<AcceptedChannel, ChannelError>;

    /// Refuse the channel.
    async fn reject(self: Box<Self>, reason: RejectionReason, message: &str) -> Result<(), ChannelError>;
}

/// An accepted logical channel.
pub struct AcceptedChannel {
    /// Channel payload stream.
    pub stream: BoxedStream,
    /// Out-of-band requests addressed to this channel.
    pub requests: mpsc::Receiver<IncomingRequest>,
}

/// Everything a successful handshake produces.
pub struct Handshake {
    pub conn: Box<dyn ServerConn>,
    pub permissions: Option<Permissions>,
    pub channels: mpsc::Receiver<Box<dyn NewChannel>>,
    /// Global (connection-level) requests.
    pub requests: mpsc::Receiver<IncomingRequest>,
}

/// Reason codes for refusing a channel open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionReason {
    Prohibited,
    ConnectionFailed,
    UnknownChannelType,
    ResourceShortage,
}

impl RejectionReason {
    /// Numeric reason code as carried on the wire.
    pub fn code(&self) -> u32 {
        match self {
            RejectionReason::Prohibited => 1,
            RejectionReason::ConnectionFailed => 2,
            RejectionReason::UnknownChannelType => 3,
            RejectionReason::ResourceShortage => 4,
        }
    }
}

/// Authorization facts attached to a connection by the handshake.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Permissions {
    /// Options that must be honoured or the session refused.
    pub critical_options: HashMap<String, String>,
    /// Informational extensions.
    pub extensions: HashMap<String, String>,
}

/// How the transport should authenticate clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthPolicy {
    /// Clients must authenticate.
    #[default]
    Required,
    /// Any client may connect without authenticating.
    NoClientAuth,
}

/// Identity and authentication settings handed to the transport.
pub struct HandshakeConfig<K> {
    host_keys: Vec<Arc<K>>,
    pub auth: AuthPolicy,
}

impl<K> HandshakeConfig<K> {
    pub fn new(auth: AuthPolicy) -> Self {
        Self {
            host_keys: Vec::new(),
            auth,
        }
    }

    /// A configuration that lets any client in without authentication.
    pub fn public() -> Self {
        Self::new(AuthPolicy::NoClientAuth)
    }

    pub fn add_host_key(&mut self, key: K) {
        self.host_keys.push(Arc::new(key));
    }

    pub fn host_keys(&self) -> &[Arc<K>] {
        &self.host_keys
    }
}

impl<K> Default for HandshakeConfig<K> {
    fn default() -> Self {
        Self::new(AuthPolicy::default())
    }
}

impl<K> Clone for HandshakeConfig<K> {
    fn clone(&self) -> Self {
        Self {
            host_keys: self.host_keys.clone(),
            auth: self.auth,
        }
    }
}

impl<K> std::fmt::Debug for HandshakeConfig<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandshakeConfig")
            .field("host_keys", &self.host_keys.len())
            .field("auth", &self.auth)
            .finish()
    }
}
