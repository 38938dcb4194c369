//! Tokio-based WebSocket server.
//!
//! `WebSocketServer` spawns worker tasks that accept TCP connections,
//! perform the opening handshake and run a [`Session`](crate::session::Session)
//! per connection with a handler produced by the server's factory.

use std::{sync::Arc, time::Duration};

use tokio::{net::TcpListener, sync::oneshot};

use crate::{config::SessionConfig, session::MessageHandler};

/// Factory producing a fresh [`MessageHandler`] for each connection.
///
/// Implemented for every `Fn() -> H` closure that is `Send + Sync + Clone`.
pub trait HandlerFactory: Fn() -> Self::Handler + Send + Sync + Clone + 'static {
    /// Handler type built for each connection.
    type Handler: MessageHandler + 'static;
}

impl<F, H> HandlerFactory for F
where
    F: Fn() -> H + Send + Sync + Clone + 'static,
    H: MessageHandler + 'static,
{
    type Handler = H;
}

/// Tokio-based server running a WebSocket session per connection.
///
/// The server carries a typestate `S` indicating whether it is [`Unbound`]
/// (not yet bound to a TCP listener) or [`Bound`]. New servers start
/// `Unbound` and must call `bind` or `bind_listener` before running. Each
/// worker task accepts from the shared listener; each accepted connection
/// receives its own handler from the factory closure.
pub struct WebSocketServer<F, S = Unbound>
where
    F: HandlerFactory,
    S: ServerState,
{
    pub(crate) factory: F,
    pub(crate) workers: usize,
    pub(crate) session_config: SessionConfig,
    pub(crate) backoff_config: BackoffConfig,
    /// Upper bound on reading the upgrade request and writing the response.
    pub(crate) handshake_timeout: Duration,
    /// Notified once every worker has been spawned. Single use: a new sender
    /// is needed for each run.
    pub(crate) ready_tx: Option<oneshot::Sender<()>>,
    pub(crate) state: S,
}

/// Marker indicating the server has not yet bound a listener.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unbound;

/// Marker indicating the server is bound to a TCP listener.
#[derive(Debug, Clone)]
pub struct Bound {
    pub(crate) listener: Arc<TcpListener>,
}

/// Trait implemented by [`Unbound`] and [`Bound`] to model binding typestate.
pub trait ServerState: sealed::Sealed {}

mod sealed {
    //! Prevent external implementations of [`ServerState`].

    pub trait Sealed {}
    impl Sealed for super::Unbound {}
    impl Sealed for super::Bound {}
}

impl ServerState for Unbound {}
impl ServerState for Bound {}

mod config;
mod connection;
pub mod error;
mod runtime;

pub use config::DEFAULT_HANDSHAKE_TIMEOUT;
pub use error::ServerError;
pub use runtime::BackoffConfig;

#[cfg(test)]
pub(crate) mod test_util;
