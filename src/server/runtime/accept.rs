//! Accept loop run by each server worker.

use std::sync::Arc;

use log::warn;
use tokio::{
    net::TcpListener,
    select,
    time::{Duration, sleep},
};
use tokio_util::{sync::CancellationToken, task::TaskTracker};

use super::backoff::BackoffConfig;
use crate::{
    config::SessionConfig,
    server::{
        HandlerFactory,
        connection::{ConnectionContext, spawn_connection_task},
    },
};

#[derive(Debug)]
pub(in crate::server) struct AcceptLoopOptions {
    pub session: SessionConfig,
    pub handshake_timeout: Duration,
    pub shutdown: CancellationToken,
    pub tracker: TaskTracker,
    pub backoff: BackoffConfig,
}

/// Accept connections from `listener` until `options.shutdown` is cancelled.
///
/// Each accepted stream is handed to a tracked connection task with a fresh
/// handler from `factory`. Accept failures are logged and retried after an
/// exponentially growing delay that resets on the next success.
pub(in crate::server) async fn accept_loop<F>(
    listener: Arc<TcpListener>,
    factory: F,
    options: AcceptLoopOptions,
) where
    F: HandlerFactory,
{
    let backoff = options.backoff.normalized();
    let context = ConnectionContext {
        session: options.session,
        handshake_timeout: options.handshake_timeout,
        shutdown: options.shutdown,
    };
    let mut delay = backoff.initial_delay;
    while let Some(next) =
        accept_iteration(&listener, &factory, &context, &options.tracker, &backoff, delay).await
    {
        delay = next;
    }
}

async fn accept_iteration<F>(
    listener: &TcpListener,
    factory: &F,
    context: &ConnectionContext,
    tracker: &TaskTracker,
    backoff: &BackoffConfig,
    delay: Duration,
) -> Option<Duration>
where
    F: HandlerFactory,
{
    select! {
        biased;

        () = context.shutdown.cancelled() => None,
        res = listener.accept() => Some(match res {
            Ok((stream, _)) => {
                spawn_connection_task(stream, factory.clone(), context.clone(), tracker);
                backoff.initial_delay
            }
            Err(e) => {
                let local_addr = listener.local_addr().ok();
                warn!("accept error: error={e:?}, local_addr={local_addr:?}");
                crate::metrics::inc_errors("accept");
                sleep(delay).await;
                backoff.next_delay(delay)
            }
        }),
    }
}
