//! Server setup and accept loop.
//!
//! # Responsibilities
//! - Hold host keys and the handshake configuration
//! - Own the listener for the duration of `serve`
//! - Retry temporary accept errors with capped exponential backoff
//! - Spawn one connection task per accepted socket
//!
//! # Design Decisions
//! - `serve` refuses to start without host keys
//! - Per-connection failures never end the accept loop
//! - The state hook runs on whichever task transitions the connection

use std::convert::Infallible;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use crate::config::load_config;
use crate::config::schema::{ServerConfig, DEFAULT_LISTEN_ADDRESS};
use crate::error::ServerError;
use crate::handler::{DefaultHandler, Handler};
use crate::net::connection::{ConnInfo, ConnectionId, Connection};
use crate::net::listener::{is_temporary, KeepAliveListener, Listener};
use crate::net::state::ConnState;
use crate::observability::metrics as server_metrics;
use crate::resilience::backoff::AcceptBackoff;
use crate::resilience::panic;
use crate::transport::{AuthPolicy, HandshakeConfig, Transport};

/// Callback invoked on every connection state transition.
///
/// Called concurrently from many connections; implementations must be
/// thread-safe.
pub type ConnStateHook = Arc<dyn Fn(&ConnInfo, ConnState) + Send + Sync>;

/// State shared by every connection spawned from one `serve` call.
pub(crate) struct Shared<T: Transport> {
    pub(crate) transport: Arc<T>,
    pub(crate) handshake: HandshakeConfig<T::HostKey>,
    pub(crate) handler: Arc<dyn Handler>,
    pub(crate) conn_state: Option<ConnStateHook>,
    pub(crate) debug_connections: bool,
}

/// A server for multiplexed remote sessions.
///
/// ```ignore
/// let mut server = Server::new(transport)
///     .with_handler(|_perms, channel, requests| async move { /* ... */ });
/// server.add_host_key(std::fs::File::open("host_key")?)?;
/// server.listen_and_serve().await?;
/// ```
pub struct Server<T: Transport> {
    config: ServerConfig,
    transport: Arc<T>,
    handler: Option<Arc<dyn Handler>>,
    conn_state: Option<ConnStateHook>,
    handshake: HandshakeConfig<T::HostKey>,
    host_key_count: usize,
}

impl<T: Transport> Server<T> {
    /// Create a server with default configuration and no host keys.
    pub fn new(transport: T) -> Self {
        Self::with_config(transport, ServerConfig::default())
    }

    /// Create a server from configuration without touching the filesystem.
    pub fn with_config(transport: T, config: ServerConfig) -> Self {
        let handshake = HandshakeConfig::new(config.auth.policy());
        Self {
            config,
            transport: Arc::new(transport),
            handler: None,
            conn_state: None,
            handshake,
            host_key_count: 0,
        }
    }

    /// Create a server from configuration and load its host key files.
    pub fn from_config(transport: T, config: ServerConfig) -> Result<Self, ServerError> {
        let paths = config.host_keys.clone();
        let mut server = Self::with_config(transport, config);
        server.load_host_keys(&paths)?;
        Ok(server)
    }

    /// Load a TOML configuration file and build a server from it.
    pub fn from_config_file(transport: T, path: impl AsRef<Path>) -> Result<Self, ServerError> {
        let config = load_config(path.as_ref())?;
        Self::from_config(transport, config)
    }

    /// Handler invoked for every session. [`DefaultHandler`] when unset.
    pub fn with_handler(mut self, handler: impl Handler) -> Self {
        self.handler = Some(Arc::new(handler));
        self
    }

    /// Callback for connection state changes.
    pub fn with_conn_state<F>(mut self, hook: F) -> Self
    where
        F: Fn(&ConnInfo, ConnState) + Send + Sync + 'static,
    {
        self.conn_state = Some(Arc::new(hook));
        self
    }

    /// Trace every read and write on raw connections.
    pub fn with_debug_connections(mut self, enabled: bool) -> Self {
        self.config.listener.debug_connections = enabled;
        self
    }

    pub fn with_auth_policy(mut self, auth: AuthPolicy) -> Self {
        self.handshake.auth = auth;
        self
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn host_key_count(&self) -> usize {
        self.host_key_count
    }

    /// Read a private key from `reader` and register it as a host key.
    ///
    /// Leaves the server unchanged if the key cannot be read or parsed.
    pub fn add_host_key(&mut self, mut reader: impl Read) -> Result<(), ServerError> {
        let mut raw = Vec::new();
        reader.read_to_end(&mut raw)?;
        let key = self.transport.parse_host_key(&raw)?;

        self.host_key_count += 1;
        self.handshake.add_host_key(key);
        Ok(())
    }

    /// Register each key file in `paths` as a host key.
    pub fn load_host_keys<P: AsRef<Path>>(&mut self, paths: &[P]) -> Result<(), ServerError> {
        for path in paths {
            let path = path.as_ref();
            let file = std::fs::File::open(path)?;
            self.add_host_key(file)?;
            tracing::info!(path = %path.display(), "Host key loaded");
        }
        Ok(())
    }

    /// Bind the configured address and serve it.
    ///
    /// Accepted sockets get TCP keep-alive. Only returns on error.
    pub async fn listen_and_serve(&self) -> Result<Infallible, ServerError> {
        let addr = match self.config.listener.address.as_str() {
            "" => DEFAULT_LISTEN_ADDRESS,
            addr => addr,
        };
        let listener = KeepAliveListener::bind(addr, self.config.listener.keepalive())
            .await
            .map_err(|source| ServerError::Bind {
                addr: addr.to_string(),
                source,
            })?;
        self.serve(listener).await
    }

    /// Accept connections on `listener`, serving each on its own task.
    ///
    /// Only returns on error; the listener is closed when it does.
    pub async fn serve<L: Listener>(&self, mut listener: L) -> Result<Infallible, ServerError> {
        if self.host_key_count == 0 {
            return Err(ServerError::NoHostKeys);
        }

        panic::install_hook();
        let local_addr = listener.local_addr()?;
        let shared = Arc::new(Shared {
            transport: Arc::clone(&self.transport),
            handshake: self.handshake.clone(),
            handler: self
                .handler
                .clone()
                .unwrap_or_else(|| Arc::new(DefaultHandler)),
            conn_state: self.conn_state.clone(),
            debug_connections: self.config.listener.debug_connections,
        });
        let mut backoff = AcceptBackoff::new(
            self.config.backoff.initial_delay(),
            self.config.backoff.max_delay(),
        );

        tracing::info!(address = %local_addr, host_keys = self.host_key_count, "Server accepting connections");

        loop {
            let (io, remote_addr) = match listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) if is_temporary(&e) => {
                    server_metrics::record_accept_error(true);
                    let delay = backoff.next_delay();
                    tracing::warn!(error = %e, retry_in = ?delay, "Accept error, retrying");
                    tokio::time::sleep(delay).await;
                    continue;
                }
                Err(e) => {
                    server_metrics::record_accept_error(false);
                    tracing::error!(error = %e, "Accept failed, shutting down listener");
                    return Err(ServerError::Accept(e));
                }
            };
            backoff.reset();
            server_metrics::record_accept();

            let info = ConnInfo {
                id: ConnectionId::new(),
                local_addr,
                remote_addr,
            };
            let mut conn = Connection::new(Arc::clone(&shared), io, info);
            // Reported before the task starts so New always comes first.
            conn.set_state(ConnState::New);
            tracing::debug!(connection_id = %conn.info().id, remote_addr = %remote_addr, "Connection accepted");

            tokio::spawn(conn.serve());
        }
    }
}

impl<T: Transport> std::fmt::Debug for Server<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("address", &self.config.listener.address)
            .field("host_key_count", &self.host_key_count)
            .field("handshake", &self.handshake)
            .field("has_handler", &self.handler.is_some())
            .finish()
    }
}
