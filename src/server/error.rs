//! Errors raised by [`WebSocketServer`](super::WebSocketServer) operations.

use std::io;

use thiserror::Error;

/// Errors that may occur while binding or running the server.
///
/// Failures to accept a connection never surface here: each worker logs
/// them and retries after a back-off delay.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Binding or configuring the listener failed.
    #[error("bind error: {0}")]
    Bind(#[source] io::Error),
}
