//! Test helpers shared across server modules.

use std::net::{Ipv4Addr, SocketAddr, TcpListener as StdTcpListener};

use rstest::fixture;

use super::{Bound, HandlerFactory, WebSocketServer};
use crate::session::EchoHandler;

#[fixture]
pub fn factory() -> impl Fn() -> EchoHandler + Send + Sync + Clone + 'static { || EchoHandler }

#[fixture]
/// Returns a bound [`StdTcpListener`] on a free port for use in tests.
///
/// Keeping the listener bound prevents another process from claiming the
/// port between discovery and use.
pub fn free_listener() -> StdTcpListener {
    let addr = SocketAddr::new(Ipv4Addr::LOCALHOST.into(), 0);
    StdTcpListener::bind(addr).expect("Failed to bind free port listener")
}

pub fn bind_server<F>(factory: F, listener: StdTcpListener) -> WebSocketServer<F, Bound>
where
    F: HandlerFactory,
{
    WebSocketServer::new(factory)
        .bind_listener(listener)
        .expect("Failed to bind")
}
