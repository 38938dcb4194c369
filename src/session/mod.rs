//! Per-connection WebSocket session.
//!
//! A [`Session`] owns one upgraded transport and runs two loops over it
//! concurrently:
//!
//! - the **reader** decodes client frames and turns each into at most one outbound frame (a pong,
//!   an application reply, or a close);
//! - the **writer** drains those frames in FIFO order, writing and flushing each one.
//!
//! The loops share an unbounded queue with the reader as its only producer
//! and the writer as its only consumer, plus a one-shot shutdown token. Once
//! the writer has written a close frame it cancels the token and stops; the
//! reader observes the token and stops decoding. After both loops exit the
//! transport is shut down.

mod counter;
mod handler;
mod reader;
mod state;
mod writer;

use std::{fmt, io};

use bytes::BytesMut;
pub use counter::active_session_count;
use counter::ActiveSession;
pub use handler::{EchoHandler, FixedReply, MessageHandler};
use log::{debug, info};
use reader::Reader;
pub use state::SessionState;
use state::StateCell;
use thiserror::Error;
use tokio::{
    io::{AsyncRead, AsyncWrite, AsyncWriteExt},
    sync::mpsc,
};
use tokio_util::{codec::FramedWrite, sync::CancellationToken};
use writer::Writer;

use crate::{
    codec::{FrameEncoder, FrameReader},
    config::SessionConfig,
    protocol::StatusCode,
};

/// Errors that end a session without a completed close handshake.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Writing or flushing a frame failed.
    #[error("transport error: {0}")]
    Transport(#[source] io::Error),
}

/// Which side started the close handshake.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CloseInitiator {
    /// The client sent a close frame.
    Peer,
    /// The session was asked to stop, for example on server shutdown.
    Local,
    /// The client sent bytes that are not a valid frame, or a frame that
    /// breaks the protocol.
    Error,
}

impl fmt::Display for CloseInitiator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Peer => "peer",
            Self::Local => "local",
            Self::Error => "error",
        };
        f.write_str(name)
    }
}

/// Summary of a finished session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionOutcome {
    /// Final lifecycle state; always [`SessionState::Closed`] once `run`
    /// returns.
    pub state: SessionState,
    /// Status of the close frame written to the client, if one was.
    pub close_status: Option<StatusCode>,
    /// Which side started the close, if a close was queued.
    pub initiator: Option<CloseInitiator>,
    /// Frames decoded from the client.
    pub frames_received: u64,
    /// Frames written to the client.
    pub frames_sent: u64,
}

/// A WebSocket session over an already upgraded transport.
///
/// # Examples
///
/// ```
/// use wiresock::{
///     protocol::StatusCode,
///     session::{CloseInitiator, EchoHandler, Session},
/// };
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), wiresock::session::SessionError> {
/// let (server, _client) = tokio::io::duplex(1024);
/// let session = Session::new(EchoHandler);
/// session.stop_token().cancel();
///
/// let outcome = session.run(server).await?;
/// assert_eq!(outcome.initiator, Some(CloseInitiator::Local));
/// assert_eq!(outcome.close_status, Some(StatusCode::GOING_AWAY));
/// # Ok(())
/// # }
/// ```
pub struct Session<H> {
    handler: H,
    config: SessionConfig,
    stop: CancellationToken,
    prefetched: BytesMut,
}

impl<H> Session<H>
where
    H: MessageHandler,
{
    /// Create a session answering data frames with `handler`.
    #[must_use]
    pub fn new(handler: H) -> Self {
        Self {
            handler,
            config: SessionConfig::default(),
            stop: CancellationToken::new(),
            prefetched: BytesMut::new(),
        }
    }

    /// Use `config` for read limits and frame checks.
    #[must_use]
    pub fn config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    /// Stop the session when `token` is cancelled.
    ///
    /// The reader then queues a `1001 going away` close frame and the
    /// session finishes its close handshake.
    #[must_use]
    pub fn stop_on(mut self, token: CancellationToken) -> Self {
        self.stop = token;
        self
    }

    /// Decode `bytes` before anything read from the transport.
    ///
    /// Used for frames that arrived in the same read as the HTTP upgrade
    /// request.
    #[must_use]
    pub fn prefetched(mut self, bytes: BytesMut) -> Self {
        self.prefetched = bytes;
        self
    }

    /// Token that stops this session when cancelled.
    #[must_use]
    pub fn stop_token(&self) -> CancellationToken { self.stop.clone() }

    /// Run the reader and writer loops until the close handshake finishes,
    /// then shut the transport down.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Transport`] if writing a frame fails. Decode
    /// failures are not errors here: they end the session with a close
    /// frame and are reported through [`SessionOutcome::initiator`].
    pub async fn run<T>(self, transport: T) -> Result<SessionOutcome, SessionError>
    where
        T: AsyncRead + AsyncWrite + Unpin,
    {
        let _guard = ActiveSession::new();
        info!("session started: active={}", active_session_count());

        let (read_half, write_half) = tokio::io::split(transport);
        let (tx, rx) = mpsc::unbounded_channel();
        let shutdown = CancellationToken::new();
        let state = StateCell::new();

        let reader = Reader {
            frames: FrameReader::new(read_half, &self.config).with_prefetched(&self.prefetched),
            handler: &self.handler,
            config: self.config,
            outbound: tx,
            shutdown: &shutdown,
            stop: &self.stop,
            state: &state,
        };
        let writer = Writer {
            sink: FramedWrite::new(write_half, FrameEncoder::default()),
            inbound: rx,
            shutdown: &shutdown,
            state: &state,
        };

        let ((frames, read), (write_half, written)) = tokio::join!(reader.run(), writer.run());
        let written = written?;

        let mut transport = frames.into_inner().unsplit(write_half);
        if let Err(e) = transport.shutdown().await {
            debug!("transport shutdown failed: error={e}");
        }

        let outcome = SessionOutcome {
            state: state.get(),
            close_status: written.close_status,
            initiator: read.initiator,
            frames_received: read.frames_received,
            frames_sent: written.frames_sent,
        };
        info!(
            "session closed: initiator={}, status={}, received={}, sent={}",
            outcome
                .initiator
                .map_or_else(|| "none".to_owned(), |i| i.to_string()),
            outcome
                .close_status
                .map_or_else(|| "none".to_owned(), |s| s.to_string()),
            outcome.frames_received,
            outcome.frames_sent
        );
        Ok(outcome)
    }
}
