//! Per-connection task for [`WebSocketServer`](super::WebSocketServer).

use std::{any::Any, borrow::Cow, net::SocketAddr, time::Duration};

use futures::FutureExt;
use log::{debug, error, info, warn};
use tokio::{net::TcpStream, select, time::timeout};
use tokio_util::{sync::CancellationToken, task::TaskTracker};

use super::HandlerFactory;
use crate::{config::SessionConfig, handshake, session::Session};

/// Shared inputs for every connection a worker spawns.
#[derive(Clone, Debug)]
pub(super) struct ConnectionContext {
    pub session: SessionConfig,
    pub handshake_timeout: Duration,
    pub shutdown: CancellationToken,
}

/// Spawn a task that upgrades `stream` and runs a session on it, logging and
/// discarding any panic.
pub(super) fn spawn_connection_task<F>(
    stream: TcpStream,
    factory: F,
    context: ConnectionContext,
    tracker: &TaskTracker,
) where
    F: HandlerFactory,
{
    let peer_addr = match stream.peer_addr() {
        Ok(addr) => Some(addr),
        Err(e) => {
            warn!("failed to retrieve peer address: error={e}");
            None
        }
    };
    tracker.spawn(async move {
        let fut =
            std::panic::AssertUnwindSafe(process_stream(stream, peer_addr, factory, context))
                .catch_unwind();

        if let Err(panic) = fut.await {
            crate::metrics::inc_connection_panics();
            let panic_msg = panic_message(panic.as_ref());
            // Emit via both `log` and `tracing` for tests that capture either.
            error!("connection task panicked: panic={panic_msg}, peer_addr={peer_addr:?}");
            tracing::error!(panic = %panic_msg, ?peer_addr, "connection task panicked");
        }
    });
}

async fn process_stream<F>(
    mut stream: TcpStream,
    peer_addr: Option<SocketAddr>,
    factory: F,
    context: ConnectionContext,
) where
    F: HandlerFactory,
{
    let upgrade = select! {
        biased;

        () = context.shutdown.cancelled() => {
            debug!("shutdown during handshake: peer_addr={peer_addr:?}");
            return;
        }
        res = timeout(context.handshake_timeout, handshake::accept(&mut stream)) => res,
    };
    let leftover = match upgrade {
        Ok(Ok(leftover)) => leftover,
        Ok(Err(e)) => {
            info!("handshake failed: error={e}, peer_addr={peer_addr:?}");
            return;
        }
        Err(_) => {
            info!(
                "handshake timed out: timeout={:?}, peer_addr={peer_addr:?}",
                context.handshake_timeout
            );
            crate::metrics::inc_errors("handshake_timeout");
            return;
        }
    };
    debug!("connection upgraded: peer_addr={peer_addr:?}");

    let session = Session::new(factory())
        .config(context.session)
        .stop_on(context.shutdown.child_token())
        .prefetched(leftover);
    match session.run(stream).await {
        Ok(outcome) => info!(
            "session finished: peer_addr={peer_addr:?}, initiator={:?}, close_status={:?}, \
             frames_received={}, frames_sent={}",
            outcome.initiator,
            outcome.close_status.map(u16::from),
            outcome.frames_received,
            outcome.frames_sent,
        ),
        Err(e) => warn!("session failed: error={e}, peer_addr={peer_addr:?}"),
    }
}

/// Render a panic payload, falling back to `Debug` for non-string payloads.
fn panic_message(payload: &(dyn Any + Send)) -> Cow<'_, str> {
    if let Some(s) = payload.downcast_ref::<String>() {
        Cow::Borrowed(s)
    } else if let Some(s) = payload.downcast_ref::<&'static str>() {
        Cow::Borrowed(s)
    } else {
        Cow::Owned(format!("{payload:?}"))
    }
}
