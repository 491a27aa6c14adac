//! Error types shared across the server.
//!
//! # Taxonomy
//! - Setup errors (no host keys, bad address, unparseable key) are returned
//!   to the caller of the offending method.
//! - Accept errors are either retried (temporary) or end `Server::serve`.
//! - Handshake, channel and handler failures are contained per connection
//!   and only ever logged.

use std::io;

use thiserror::Error;

use crate::config::loader::ConfigError;

/// Errors surfaced by [`Server`](crate::Server) setup and serving.
#[derive(Debug, Error)]
pub enum ServerError {
    /// `serve` was called before any host key was added.
    #[error("server has no host keys")]
    NoHostKeys,

    /// The listen address could not be parsed or bound.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    /// The listener failed with a non-temporary error.
    #[error("accept failed: {0}")]
    Accept(#[source] io::Error),

    /// A host key could not be read or parsed.
    #[error("invalid host key: {0}")]
    HostKey(#[from] KeyError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// A host key was rejected by the transport's key parser.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct KeyError(pub String);

impl KeyError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Why a handshake did not produce an authenticated connection.
#[derive(Debug, Error)]
pub enum HandshakeError {
    /// The peer closed the stream before the handshake completed.
    ///
    /// This is the clean end-of-stream case and is not logged.
    #[error("connection closed during handshake")]
    Eof,

    #[error("handshake I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("authentication failed: {0}")]
    Auth(String),
}

impl HandshakeError {
    /// Whether this error is the clean end-of-stream signal.
    pub fn is_eof(&self) -> bool {
        matches!(self, HandshakeError::Eof)
    }
}

/// Accepting or rejecting an offered channel failed.
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("connection closed")]
    ConnectionClosed,

    #[error("channel I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Replying to a [`Request`](crate::Request) failed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReplyError {
    #[error("request already replied to")]
    AlreadyReplied,

    /// The transport dropped its end before the reply arrived.
    #[error("request peer is gone")]
    Closed,
}
