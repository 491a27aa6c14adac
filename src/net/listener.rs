//! Listener abstraction and TCP implementations.
//!
//! # Responsibilities
//! - Bind to the configured address
//! - Accept incoming connections as boxed duplex streams
//! - Enable TCP keep-alive on accepted sockets
//! - Classify accept errors as temporary or permanent
//!
//! # Design Decisions
//! - `Server::serve` takes any [`Listener`], so tests can inject failures
//! - Keep-alive failures are logged and never fail the accept

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use socket2::{SockRef, TcpKeepalive};
use tokio::net::{TcpListener, TcpStream};

use crate::transport::BoxedStream;

/// Keep-alive period applied by [`KeepAliveListener`] unless configured.
pub const DEFAULT_KEEPALIVE: Duration = Duration::from_secs(3 * 60);

/// Source of raw connections for [`Server::serve`](crate::Server::serve).
#[async_trait]
pub trait Listener: Send + 'static {
    /// Wait for the next connection.
    async fn accept(&mut self) -> io::Result<(BoxedStream, SocketAddr)>;

    /// Address this listener is bound to.
    fn local_addr(&self) -> io::Result<SocketAddr>;
}

#[async_trait]
impl Listener for TcpListener {
    async fn accept(&mut self) -> io::Result<(BoxedStream, SocketAddr)> {
        let (stream, addr) = TcpListener::accept(self).await?;
        Ok((Box::new(stream), addr))
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        TcpListener::local_addr(self)
    }
}

/// A TCP listener that turns on keep-alive for every accepted socket, so
/// dead peers eventually go away.
#[derive(Debug)]
pub struct KeepAliveListener {
    inner: TcpListener,
    period: Duration,
}

impl KeepAliveListener {
    pub fn new(inner: TcpListener, period: Duration) -> Self {
        Self { inner, period }
    }

    /// Bind to `addr` with the given keep-alive period.
    pub async fn bind(addr: &str, period: Duration) -> io::Result<Self> {
        let inner = TcpListener::bind(addr).await?;
        tracing::info!(
            address = %inner.local_addr()?,
            keepalive_secs = period.as_secs(),
            "Listener bound"
        );
        Ok(Self::new(inner, period))
    }

    pub fn period(&self) -> Duration {
        self.period
    }
}

#[async_trait]
impl Listener for KeepAliveListener {
    async fn accept(&mut self) -> io::Result<(BoxedStream, SocketAddr)> {
        let (stream, addr) = self.inner.accept().await?;
        if let Err(e) = set_keepalive(&stream, self.period) {
            tracing::warn!(peer_addr = %addr, error = %e, "Failed to enable TCP keep-alive");
        }
        Ok((Box::new(stream), addr))
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        self.inner.local_addr()
    }
}

/// Enable keep-alive, using `period` as both the idle time and the
/// retransmission interval.
fn set_keepalive(stream: &TcpStream, period: Duration) -> io::Result<()> {
    let keepalive = TcpKeepalive::new().with_time(period);
    #[cfg(any(
        target_os = "linux",
        target_os = "android",
        target_os = "macos",
        target_os = "ios",
        target_os = "freebsd",
        target_os = "netbsd",
        target_os = "windows",
    ))]
    let keepalive = keepalive.with_interval(period);
    SockRef::from(stream).set_tcp_keepalive(&keepalive)
}

/// Whether an accept error is transient and worth retrying.
///
/// Covers per-connection failures (the peer went away before accept
/// finished) and resource exhaustion such as running out of descriptors.
pub fn is_temporary(err: &io::Error) -> bool {
    if matches!(
        err.kind(),
        io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::Interrupted
            | io::ErrorKind::WouldBlock
            | io::ErrorKind::TimedOut
            | io::ErrorKind::OutOfMemory
    ) {
        return true;
    }

    #[cfg(unix)]
    if let Some(errno) = err.raw_os_error() {
        return errno == libc::EMFILE
            || errno == libc::ENFILE
            || errno == libc::ENOBUFS
            || errno == libc::ENOMEM
            || errno == libc::EAGAIN;
    }

    false
}
