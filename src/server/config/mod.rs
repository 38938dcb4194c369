//! Configuration utilities for [`WebSocketServer`].

use std::time::Duration;

use tokio::sync::oneshot;

use super::{BackoffConfig, HandlerFactory, ServerState, Unbound, WebSocketServer};
use crate::config::SessionConfig;

pub mod binding;

/// Default limit on how long a client may take to complete the upgrade.
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);


impl<F> WebSocketServer<F, Unbound>
where
    F: HandlerFactory,
{
    /// Create a new `WebSocketServer` from the given handler factory.
    ///
    /// The worker count defaults to the number of available CPU cores (or 1
    /// if this cannot be determined). Call `bind` before running the server.
    ///
    /// # Examples
    ///
    /// ```
    /// use wiresock::{server::WebSocketServer, session::EchoHandler};
    ///
    /// let server = WebSocketServer::new(|| EchoHandler);
    /// assert!(server.worker_count() >= 1);
    /// ```
    #[must_use]
    pub fn new(factory: F) -> Self {
        let workers = std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get);
        Self {
            factory,
            workers,
            session_config: SessionConfig::default(),
            backoff_config: BackoffConfig::default(),
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
            ready_tx: None,
            state: Unbound,
        }
    }
}

impl<F, S> WebSocketServer<F, S>
where
    F: HandlerFactory,
    S: ServerState,
{
    /// Set the number of worker tasks to spawn for the server.
    #[must_use]
    pub fn workers(mut self, count: usize) -> Self {
        self.workers = count.max(1);
        self
    }

    /// Apply `config` to every session the server runs.
    #[must_use]
    pub fn session_config(mut self, config: SessionConfig) -> Self {
        self.session_config = config;
        self
    }

    /// Configure the accept-loop back-off. Values are normalised before use.
    #[must_use]
    pub fn accept_backoff(mut self, config: BackoffConfig) -> Self {
        self.backoff_config = config.normalized();
        self
    }

    /// Limit how long a connection may spend in the opening handshake.
    ///
    /// Connections that have not completed the upgrade in time are dropped.
    /// A zero duration is raised to one millisecond.
    #[must_use]
    pub fn handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout.max(Duration::from_millis(1));
        self
    }

    /// Configure a channel used to signal when the server is ready to accept
    /// connections.
    #[must_use]
    pub fn ready_signal(mut self, tx: oneshot::Sender<()>) -> Self {
        self.ready_tx = Some(tx);
        self
    }

    /// Returns the configured number of worker tasks for the server.
    #[inline]
    #[must_use]
    pub const fn worker_count(&self) -> usize { self.workers }

    /// Returns the handshake deadline applied to each connection.
    #[must_use]
    pub const fn handshake_deadline(&self) -> Duration { self.handshake_timeout }

    /// Returns the session configuration applied to each connection.
    #[must_use]
    pub const fn session_settings(&self) -> &SessionConfig { &self.session_config }
}
