//! Connection state machine and dispatch loop.
//!
//! # Responsibilities
//! - Track connection state (New → Handshake → Active → Closed)
//! - Generate unique connection IDs for tracing
//! - Drive the transport handshake
//! - Turn accepted `"session"` channels into handler invocations
//! - Contain panics and always run the close path exactly once

use std::fmt;
use std::net::SocketAddr;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures_util::FutureExt;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::error::ChannelError;
use crate::handler;
use crate::net::logging::LoggingConn;
use crate::net::state::ConnState;
use crate::resilience::panic::PanicReport;
use crate::server::Shared;
use crate::session::relay;
use crate::session::{Request, SessionChannel, SessionContext};
use crate::transport::{BoxedStream, Handshake, NewChannel, Permissions, RejectionReason, ServerConn, Transport};

/// The only channel type the server accepts.
pub const SESSION_CHANNEL_TYPE: &str = "session";

/// Global atomic counter for connection IDs.
/// Using relaxed ordering is sufficient since we only need uniqueness, not synchronization.
static CONNECTION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Generate a new unique connection ID.
    pub fn new() -> Self {
        Self(CONNECTION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Identity of one accepted raw connection.
///
/// Handed to the state-change hook and reachable from every session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnInfo {
    pub id: ConnectionId,
    /// Address of the listener that accepted the connection.
    pub local_addr: SocketAddr,
    pub remote_addr: SocketAddr,
}

type Sessions = JoinSet<Result<(), PanicReport>>;

/// Why the dispatch loop gave up on a connection.
enum Abandon {
    Accept(ChannelError),
}

/// Server side of one raw connection.
pub(crate) struct Connection<T: Transport> {
    shared: Arc<Shared<T>>,
    info: Arc<ConnInfo>,
    /// Raw stream until it is handed to the transport.
    io: Option<BoxedStream>,
    /// Authenticated connection once the handshake succeeded.
    conn: Option<Box<dyn ServerConn>>,
    /// Parent of every session context on this connection.
    base: CancellationToken,
    state: Option<ConnState>,
}

impl<T: Transport> Connection<T> {
    pub(crate) fn new(shared: Arc<Shared<T>>, io: BoxedStream, info: ConnInfo) -> Self {
        Self {
            shared,
            info: Arc::new(info),
            io: Some(io),
            conn: None,
            base: CancellationToken::new(),
            state: None,
        }
    }

    pub(crate) fn info(&self) -> &Arc<ConnInfo> {
        &self.info
    }

    /// Record a transition and report it to the state-change hook.
    pub(crate) fn set_state(&mut self, next: ConnState) {
        debug_assert!(
            match self.state {
                None => next == ConnState::New,
                Some(current) => current.can_transition_to(next),
            },
            "invalid transition {:?} -> {}",
            self.state,
            next
        );
        self.state = Some(next);

        tracing::trace!(connection_id = %self.info.id, state = %next, "Connection state changed");
        metrics::counter!("easyssh_connection_state_total", "state" => next.as_str()).increment(1);

        if let Some(hook) = &self.shared.conn_state {
            hook(self.info.as_ref(), next);
        }
    }

    /// Serve the connection until it closes.
    ///
    /// Never panics: faults anywhere in the connection or its handlers are
    /// logged and end in the close path.
    pub(crate) async fn serve(mut self) {
        let span = tracing::info_span!(
            "connection",
            connection_id = %self.info.id,
            remote_addr = %self.info.remote_addr
        );

        async move {
            let outcome = AssertUnwindSafe(self.serve_inner()).catch_unwind().await;
            if let Err(payload) = outcome {
                log_panic(self.info.remote_addr, &PanicReport::from_payload(payload));
            }
            self.close().await;
        }
        .instrument(span)
        .await
    }

    async fn serve_inner(&mut self) {
        self.set_state(ConnState::Handshake);

        let Some(mut io) = self.io.take() else {
            return;
        };
        if self.shared.debug_connections {
            io = Box::new(LoggingConn::new("server", io));
        }

        let handshake = match self.shared.transport.handshake(io, &self.shared.handshake).await {
            Ok(handshake) => handshake,
            Err(e) => {
                if !e.is_eof() {
                    tracing::error!(error = %e, "Handshake error");
                }
                return;
            }
        };
        self.set_state(ConnState::Active);

        let Handshake {
            conn,
            permissions,
            channels,
            requests,
        } = handshake;
        self.conn = Some(conn);
        let permissions = permissions.map(Arc::new);

        // Global requests are not answered.
        tokio::spawn(relay::discard(relay::pipe(requests, Request::from)));

        self.dispatch_channels(channels, permissions).await;
    }

    async fn dispatch_channels(
        &mut self,
        mut channels: mpsc::Receiver<Box<dyn NewChannel>>,
        permissions: Option<Arc<Permissions>>,
    ) {
        let mut sessions = Sessions::new();

        loop {
            tokio::select! {
                offer = channels.recv() => {
                    let Some(offer) = offer else { break };
                    if let Err(Abandon::Accept(e)) = self.handle_offer(offer, &permissions, &mut sessions).await {
                        tracing::warn!(error = %e, "Channel accept failed, abandoning connection");
                        break;
                    }
                }
                Some(joined) = sessions.join_next() => {
                    if let Err(report) = session_outcome(joined) {
                        self.detach(std::mem::take(&mut sessions));
                        std::panic::resume_unwind(Box::new(report));
                    }
                }
            }
        }

        // Handlers still running outlive the connection.
        self.detach(sessions);
    }

    /// Leave `sessions` running on their own, still reporting their panics.
    fn detach(&self, sessions: Sessions) {
        if !sessions.is_empty() {
            tokio::spawn(watch_detached(sessions, self.info.remote_addr).in_current_span());
        }
    }

    async fn handle_offer(
        &mut self,
        offer: Box<dyn NewChannel>,
        permissions: &Option<Arc<Permissions>>,
        sessions: &mut Sessions,
    ) -> Result<(), Abandon> {
        if offer.channel_type() != SESSION_CHANNEL_TYPE {
            let channel_type = offer.channel_type().to_string();
            tracing::debug!(channel_type = %channel_type, "Rejecting channel");
            metrics::counter!("easyssh_channels_rejected_total").increment(1);
            if let Err(e) = offer
                .reject(RejectionReason::UnknownChannelType, "unknown channel type")
                .await
            {
                tracing::debug!(channel_type = %channel_type, error = %e, "Channel reject failed");
            }
            return Ok(());
        }

        let accepted = offer.accept().await.map_err(Abandon::Accept)?;

        let token = self.base.child_token();
        let channel = SessionChannel::new(
            accepted.stream,
            SessionContext::new(token.clone()),
            Arc::clone(&self.info),
        );
        let requests = relay::pipe(accepted.requests, Request::from);

        sessions.spawn(handler::dispatch(
            Arc::clone(&self.shared.handler),
            permissions.clone(),
            channel,
            requests,
            token.drop_guard(),
        ));
        Ok(())
    }

    /// Close the raw connection, then report `Closed`.
    async fn close(&mut self) {
        if let Some(mut io) = self.io.take() {
            let _ = io.shutdown().await;
        }
        if let Some(mut conn) = self.conn.take() {
            if let Err(e) = conn.close().await {
                tracing::debug!(error = %e, "Error closing connection");
            }
        }
        self.set_state(ConnState::Closed);
    }
}

fn session_outcome(joined: Result<Result<(), PanicReport>, JoinError>) -> Result<(), PanicReport> {
    match joined {
        Ok(outcome) => outcome,
        Err(e) if e.is_panic() => Err(PanicReport::from_payload(e.into_panic())),
        Err(e) => {
            tracing::debug!(error = %e, "Session task cancelled");
            Ok(())
        }
    }
}

/// Drain sessions that outlived their connection.
async fn watch_detached(mut sessions: Sessions, remote_addr: SocketAddr) {
    while let Some(joined) = sessions.join_next().await {
        if let Err(report) = session_outcome(joined) {
            log_panic(remote_addr, &report);
        }
    }
}

fn log_panic(remote_addr: SocketAddr, report: &PanicReport) {
    metrics::counter!("easyssh_connection_panics_total").increment(1);
    tracing::error!(
        remote_addr = %remote_addr,
        panic = %report.message,
        backtrace = %report.backtrace,
        "Panic serving connection"
    );
}
