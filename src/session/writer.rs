//! Writer loop: the only task that writes to the transport.

use futures::SinkExt;
use log::{debug, info, warn};
use tokio::{io::AsyncWrite, sync::mpsc::UnboundedReceiver};
use tokio_util::{codec::FramedWrite, sync::CancellationToken};

use super::{SessionError, state::StateCell};
use crate::{
    codec::FrameEncoder,
    frame::Frame,
    metrics::{self, Direction},
    protocol::StatusCode,
};

/// What the writer managed to send.
#[derive(Debug, Default)]
pub(super) struct WriterOutcome {
    pub frames_sent: u64,
    /// Status of the close frame written, if one was.
    pub close_status: Option<StatusCode>,
}

/// Sole consumer of the session's outbound queue.
pub(super) struct Writer<'a, W> {
    pub sink: FramedWrite<W, FrameEncoder>,
    pub inbound: UnboundedReceiver<Frame>,
    pub shutdown: &'a CancellationToken,
    pub state: &'a StateCell,
}

impl<W> Writer<'_, W>
where
    W: AsyncWrite + Unpin,
{
    /// Write queued frames in order until a close frame has been written.
    ///
    /// Frames still queued behind the close frame are dropped. Every exit
    /// path moves the session to `Closed` and signals shutdown.
    pub(super) async fn run(mut self) -> (W, Result<WriterOutcome, SessionError>) {
        let result = self.drain().await;
        self.state.finish();
        self.shutdown.cancel();
        self.inbound.close();
        (self.sink.into_inner(), result)
    }

    async fn drain(&mut self) -> Result<WriterOutcome, SessionError> {
        let mut outcome = WriterOutcome::default();
        while let Some(frame) = self.inbound.recv().await {
            let opcode = frame.opcode;

            if let Err(e) = self.sink.send(frame).await {
                warn!("write failed: opcode={opcode}, error={e}");
                metrics::inc_errors("io");
                return Err(SessionError::Transport(e));
            }
            outcome.frames_sent += 1;
            metrics::inc_frames(Direction::Outbound);

            let close_status = self.sink.encoder().last_close_status();
            if let Some(status) = close_status {
                info!("close frame sent: status={status}");
                metrics::inc_close_frames(status);
                outcome.close_status = Some(status);
                let dropped = self.discard_queued();
                if dropped > 0 {
                    debug!("frames dropped after close: count={dropped}");
                }
                break;
            }
        }
        Ok(outcome)
    }

    fn discard_queued(&mut self) -> usize {
        self.inbound.close();
        let mut dropped = 0;
        while self.inbound.try_recv().is_ok() {
            dropped += 1;
        }
        dropped
    }
}
