//! Verbose I/O tracing decorator for raw connections.
//!
//! Only constructed when `debug_connections` is enabled on the server.

use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

use crate::transport::BoxedStream;

static LOGGING_CONN_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Wraps a stream and traces every read, write and close on it.
pub struct LoggingConn {
    name: String,
    inner: BoxedStream,
}

impl LoggingConn {
    /// Wrap `inner`, naming it `<base>-<n>` with `n` unique per process.
    pub fn new(base: &str, inner: BoxedStream) -> Self {
        let n = LOGGING_CONN_COUNTER.fetch_add(1, Ordering::Relaxed);
        Self {
            name: format!("{}-{}", base, n),
            inner,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl AsyncRead for LoggingConn {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let before = buf.filled().len();
        let result = Pin::new(&mut self.inner).poll_read(cx, buf);
        if let Poll::Ready(ref res) = result {
            let n = buf.filled().len() - before;
            match res {
                Ok(()) => tracing::debug!(conn = %self.name, capacity = buf.capacity(), n, "Read"),
                Err(e) => tracing::debug!(conn = %self.name, error = %e, "Read failed"),
            }
        }
        result
    }
}

impl AsyncWrite for LoggingConn {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let result = Pin::new(&mut self.inner).poll_write(cx, buf);
        if let Poll::Ready(ref res) = result {
            match res {
                Ok(n) => tracing::debug!(conn = %self.name, len = buf.len(), n, "Write"),
                Err(e) => tracing::debug!(conn = %self.name, len = buf.len(), error = %e, "Write failed"),
            }
        }
        result
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let result = Pin::new(&mut self.inner).poll_shutdown(cx);
        if let Poll::Ready(ref res) = result {
            tracing::debug!(conn = %self.name, result = ?res, "Close");
        }
        result
    }
}
