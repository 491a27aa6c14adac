//! Session handlers.
//!
//! # Responsibilities
//! - Define the [`Handler`] capability invoked once per session
//! - Let plain async closures act as handlers
//! - Provide the fallback [`DefaultHandler`]
//! - Wrap every invocation so the session context is cancelled afterwards
//!
//! # Design Decisions
//! - Handlers return nothing; a session ends when `serve` returns
//! - Cancellation is a completion signal, never a way to stop a handler

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::FutureExt;
use tokio_util::sync::DropGuard;

use crate::resilience::panic::PanicReport;
use crate::session::relay;
use crate::session::{Requests, SessionChannel};
use crate::transport::Permissions;

/// Serves one session.
#[async_trait]
pub trait Handler: Send + Sync + 'static {
    async fn serve(&self, permissions: Option<Arc<Permissions>>, channel: SessionChannel, requests: Requests);
}

#[async_trait]
impl<F, Fut> Handler for F
where
    F: Fn(Option<Arc<Permissions>>, SessionChannel, Requests) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    async fn serve(&self, permissions: Option<Arc<Permissions>>, channel: SessionChannel, requests: Requests) {
        (self)(permissions, channel, requests).await
    }
}

/// Use an async closure as a [`Handler`], with its argument types inferred.
///
/// ```ignore
/// let handler = handler_fn(|_perms, channel, mut requests| async move {
///     while let Some(mut req) = requests.recv().await {
///         let _ = req.reply(req.kind() == "shell", Vec::new());
///     }
///     drop(channel);
/// });
/// ```
pub fn handler_fn<F, Fut>(f: F) -> F
where
    F: Fn(Option<Arc<Permissions>>, SessionChannel, Requests) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    f
}

/// Discards every request on the channel and does nothing else.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultHandler;

#[async_trait]
impl Handler for DefaultHandler {
    async fn serve(&self, _permissions: Option<Arc<Permissions>>, _channel: SessionChannel, requests: Requests) {
        relay::discard(relay::pipe(requests, |r| r.into_inner())).await;
    }
}

/// Name of the gauge tracking handlers currently running.
pub const SESSIONS_ACTIVE: &str = "easyssh_sessions_active";

/// Holds the active-sessions gauge up for as long as it lives.
struct ActiveSession;

impl ActiveSession {
    fn enter() -> Self {
        metrics::gauge!(SESSIONS_ACTIVE).increment(1.0);
        Self
    }
}

impl Drop for ActiveSession {
    fn drop(&mut self) {
        metrics::gauge!(SESSIONS_ACTIVE).decrement(1.0);
    }
}

/// Run `handler` for one session, then cancel the session context.
///
/// `cancel` fires when it is dropped, so the context is cancelled after the
/// handler returns or panics, and only then. A panic is caught here, on the
/// panicking task, so the report keeps the stack of the panic site.
pub(crate) async fn dispatch(
    handler: Arc<dyn Handler>,
    permissions: Option<Arc<Permissions>>,
    channel: SessionChannel,
    requests: Requests,
    cancel: DropGuard,
) -> Result<(), PanicReport> {
    let session_id = channel.id();
    tracing::debug!(session_id = %session_id, "Session started");
    let _active = ActiveSession::enter();

    let outcome = AssertUnwindSafe(handler.serve(permissions, channel, requests))
        .catch_unwind()
        .await;
    drop(cancel);

    match outcome {
        Ok(()) => {
            tracing::debug!(session_id = %session_id, "Session finished");
            Ok(())
        }
        Err(payload) => Err(PanicReport::from_payload(payload)),
    }
}
