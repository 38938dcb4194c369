//! Runtime control for [`WebSocketServer`].

mod accept;
mod backoff;

use std::sync::Arc;

use accept::{AcceptLoopOptions, accept_loop};
pub use backoff::BackoffConfig;
use futures::Future;
use log::{info, warn};
use tokio::{select, signal};
use tokio_util::{sync::CancellationToken, task::TaskTracker};

use super::{Bound, HandlerFactory, ServerError, WebSocketServer};

impl<F> WebSocketServer<F, Bound>
where
    F: HandlerFactory,
{
    /// Run the server until Ctrl+C is received.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use wiresock::{server::WebSocketServer, session::EchoHandler};
    ///
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), wiresock::server::ServerError> {
    /// WebSocketServer::new(|| EchoHandler)
    ///     .bind(([127, 0, 0, 1], 9001).into())?
    ///     .run()
    ///     .await
    /// # }
    /// ```
    ///
    /// An unbound server has no `run` method:
    ///
    /// ```compile_fail
    /// use wiresock::{server::WebSocketServer, session::EchoHandler};
    ///
    /// async fn try_run() {
    ///     let _ = WebSocketServer::new(|| EchoHandler).run().await;
    /// }
    /// ```
    ///
    /// # Errors
    ///
    /// Accept failures are retried with exponential back-off and do not
    /// surface as errors; the `Result` is reserved for runtime failures.
    pub async fn run(self) -> Result<(), ServerError> {
        self.run_with_shutdown(async {
            let _ = signal::ctrl_c().await;
        })
        .await
    }

    /// Run the server until `shutdown` resolves.
    ///
    /// On shutdown the workers stop accepting and every open session is
    /// asked to close with status 1001. Connections still in the opening
    /// handshake are dropped. The call returns once all sessions have
    /// finished.
    ///
    /// # Examples
    ///
    /// ```
    /// use tokio::sync::oneshot;
    /// use wiresock::{server::WebSocketServer, session::EchoHandler};
    ///
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), wiresock::server::ServerError> {
    /// let server = WebSocketServer::new(|| EchoHandler).bind(([127, 0, 0, 1], 0).into())?;
    ///
    /// let (tx, rx) = oneshot::channel::<()>();
    /// let handle = tokio::spawn(server.run_with_shutdown(async {
    ///     let _ = rx.await;
    /// }));
    ///
    /// let _ = tx.send(());
    /// handle.await.expect("join server task")?;
    /// # Ok(())
    /// # }
    /// ```
    ///
    /// # Errors
    ///
    /// See [`run`](Self::run).
    pub async fn run_with_shutdown<S>(self, shutdown: S) -> Result<(), ServerError>
    where
        S: Future<Output = ()> + Send,
    {
        let WebSocketServer {
            factory,
            workers,
            session_config,
            backoff_config,
            handshake_timeout,
            ready_tx,
            state: Bound { listener },
        } = self;
        let shutdown_token = CancellationToken::new();
        let tracker = TaskTracker::new();

        for _ in 0..workers {
            tracker.spawn(accept_loop(
                Arc::clone(&listener),
                factory.clone(),
                AcceptLoopOptions {
                    session: session_config,
                    handshake_timeout,
                    shutdown: shutdown_token.clone(),
                    tracker: tracker.clone(),
                    backoff: backoff_config,
                },
            ));
        }
        info!(
            "server started: workers={workers}, local_addr={:?}",
            listener.local_addr().ok()
        );

        if let Some(tx) = ready_tx
            && tx.send(()).is_err()
        {
            warn!("failed to send readiness signal: receiver dropped");
        }

        select! {
            () = shutdown => shutdown_token.cancel(),
            () = tracker.wait() => {},
        }

        tracker.close();
        tracker.wait().await;
        info!("server stopped");
        Ok(())
    }
}
