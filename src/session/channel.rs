//! A logical session stream paired with its cancellation context.

use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf, ReadHalf, WriteHalf};
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};
use uuid::Uuid;

use crate::net::ConnInfo;
use crate::transport::BoxedStream;

/// Read-only view of a session's cancellation token.
///
/// Cancelled once the handler serving the session has returned. Handlers
/// observe it but cannot trigger it.
#[derive(Debug, Clone)]
pub struct SessionContext {
    token: CancellationToken,
}

impl SessionContext {
    pub(crate) fn new(token: CancellationToken) -> Self {
        Self { token }
    }

    /// Resolves when the session is finished.
    pub fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.token.cancelled()
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// A token that is cancelled together with this session.
    ///
    /// Background work may cancel the returned child early without
    /// affecting the session.
    pub fn child_token(&self) -> CancellationToken {
        self.token.child_token()
    }
}

/// One accepted `"session"` channel.
pub struct SessionChannel {
    id: Uuid,
    stream: BoxedStream,
    context: SessionContext,
    conn: Arc<ConnInfo>,
}

impl SessionChannel {
    pub(crate) fn new(stream: BoxedStream, context: SessionContext, conn: Arc<ConnInfo>) -> Self {
        Self {
            id: Uuid::new_v4(),
            stream,
            context,
            conn,
        }
    }

    /// Unique id of this session, for logs.
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    /// The connection carrying this session.
    pub fn conn(&self) -> &Arc<ConnInfo> {
        &self.conn
    }

    /// Split into independently owned read and write halves.
    pub fn split(self) -> (ReadHalf<SessionChannel>, WriteHalf<SessionChannel>) {
        tokio::io::split(self)
    }
}

impl std::fmt::Debug for SessionChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionChannel")
            .field("id", &self.id)
            .field("remote_addr", &self.conn.remote_addr)
            .field("cancelled", &self.context.is_cancelled())
            .finish()
    }
}

impl AsyncRead for SessionChannel {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.stream).poll_read(cx, buf)
    }
}

impl AsyncWrite for SessionChannel {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.stream).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.stream).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.stream).poll_shutdown(cx)
    }
}
