//! Listener binding for [`WebSocketServer`].

use std::{
    net::{SocketAddr, TcpListener as StdTcpListener},
    sync::Arc,
};

use tokio::net::TcpListener;

use crate::server::{Bound, HandlerFactory, ServerError, ServerState, Unbound, WebSocketServer};

impl<F, S> WebSocketServer<F, S>
where
    F: HandlerFactory,
    S: ServerState,
{
    fn bind_to_listener(
        self,
        std_listener: StdTcpListener,
    ) -> Result<WebSocketServer<F, Bound>, ServerError> {
        let WebSocketServer {
            factory,
            workers,
            session_config,
            backoff_config,
            handshake_timeout,
            ready_tx,
            ..
        } = self;

        std_listener
            .set_nonblocking(true)
            .map_err(ServerError::Bind)?;
        let tokio_listener = TcpListener::from_std(std_listener).map_err(ServerError::Bind)?;

        Ok(WebSocketServer {
            factory,
            workers,
            session_config,
            backoff_config,
            handshake_timeout,
            ready_tx,
            state: Bound {
                listener: Arc::new(tokio_listener),
            },
        })
    }

    /// Bind to `addr`, replacing any listener bound earlier.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::net::{Ipv4Addr, SocketAddr};
    ///
    /// use wiresock::{server::WebSocketServer, session::EchoHandler};
    ///
    /// # #[tokio::main(flavor = "current_thread")]
    /// # async fn main() {
    /// let server = WebSocketServer::new(|| EchoHandler)
    ///     .bind(SocketAddr::from((Ipv4Addr::LOCALHOST, 0)))
    ///     .expect("bind failed");
    /// assert!(server.local_addr().is_some());
    /// # }
    /// ```
    ///
    /// # Errors
    /// Returns [`ServerError::Bind`] if binding or configuring the listener
    /// fails.
    pub fn bind(self, addr: SocketAddr) -> Result<WebSocketServer<F, Bound>, ServerError> {
        let std_listener = StdTcpListener::bind(addr).map_err(ServerError::Bind)?;
        self.bind_to_listener(std_listener)
    }

    /// Bind to an existing `StdTcpListener`, replacing any listener bound
    /// earlier.
    ///
    /// # Errors
    /// Returns [`ServerError::Bind`] if configuring the listener fails.
    pub fn bind_listener(
        self,
        std_listener: StdTcpListener,
    ) -> Result<WebSocketServer<F, Bound>, ServerError> {
        self.bind_to_listener(std_listener)
    }
}

impl<F> WebSocketServer<F, Unbound>
where
    F: HandlerFactory,
{
    /// Return `None` as the server is not bound.
    #[must_use]
    pub const fn local_addr(&self) -> Option<SocketAddr> { None }
}

impl<F> WebSocketServer<F, Bound>
where
    F: HandlerFactory,
{
    /// Returns the bound address, or `None` if retrieving it fails.
    #[must_use]
    pub fn local_addr(&self) -> Option<SocketAddr> { self.state.listener.local_addr().ok() }
}
