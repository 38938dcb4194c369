//! Reader loop: decodes client frames and queues the replies.

use bytes::Bytes;
use log::{debug, info, warn};
use tokio::{io::AsyncRead, sync::mpsc::UnboundedSender};
use tokio_util::sync::CancellationToken;

use super::{CloseInitiator, MessageHandler, state::StateCell};
use crate::{
    codec::{CodecError, FrameReader},
    config::{MAX_CONTROL_PAYLOAD, SessionConfig},
    frame::Frame,
    metrics::{self, Direction},
    protocol::{OpCode, StatusCode, validate},
};

/// What the reader observed before it stopped.
#[derive(Debug, Default)]
pub(super) struct ReaderOutcome {
    pub initiator: Option<CloseInitiator>,
    pub frames_received: u64,
}

/// Whether the loop keeps reading after handling a frame.
enum Flow {
    Continue,
    Stop,
}

enum Event {
    Shutdown,
    Stop,
    Frame(Result<Frame, CodecError>),
}

/// Sole producer for the writer's queue.
pub(super) struct Reader<'a, R, H: ?Sized> {
    pub frames: FrameReader<R>,
    pub handler: &'a H,
    pub config: SessionConfig,
    pub outbound: UnboundedSender<Frame>,
    pub shutdown: &'a CancellationToken,
    pub stop: &'a CancellationToken,
    pub state: &'a StateCell,
}

impl<R, H> Reader<'_, R, H>
where
    R: AsyncRead + Unpin,
    H: MessageHandler + ?Sized,
{
    /// Decode frames until a close is queued or shutdown is signalled.
    ///
    /// Returns the frame reader so the transport half can be recovered.
    pub(super) async fn run(mut self) -> (FrameReader<R>, ReaderOutcome) {
        let mut outcome = ReaderOutcome::default();
        loop {
            match self.next_event().await {
                Event::Shutdown => break,
                Event::Stop => {
                    self.close(
                        StatusCode::GOING_AWAY,
                        Bytes::new(),
                        CloseInitiator::Local,
                        &mut outcome,
                    );
                    break;
                }
                Event::Frame(Err(e)) => {
                    if e.is_transport_failure() {
                        warn!("read failed: error={e}");
                    } else {
                        info!("invalid frame: error={e}");
                    }
                    metrics::inc_errors(e.error_type());
                    let status = e.close_status();
                    self.close(status, Bytes::new(), CloseInitiator::Error, &mut outcome);
                    break;
                }
                Event::Frame(Ok(frame)) => {
                    outcome.frames_received += 1;
                    metrics::inc_frames(Direction::Inbound);
                    if let Flow::Stop = self.dispatch(frame, &mut outcome).await {
                        break;
                    }
                }
            }
        }
        (self.frames, outcome)
    }

    async fn next_event(&mut self) -> Event {
        let (shutdown, stop) = (self.shutdown, self.stop);
        tokio::select! {
            biased;

            () = shutdown.cancelled() => Event::Shutdown,
            () = stop.cancelled() => Event::Stop,
            res = self.frames.read_frame() => Event::Frame(res),
        }
    }

    async fn dispatch(&mut self, frame: Frame, outcome: &mut ReaderOutcome) -> Flow {
        debug!(
            "frame received: opcode={}, fin={}, len={}",
            frame.opcode,
            frame.fin,
            frame.payload.len()
        );
        if let Some(status) = self.violation(&frame) {
            self.close(status, Bytes::new(), CloseInitiator::Error, outcome);
            return Flow::Stop;
        }

        match frame.opcode {
            OpCode::Ping => self.enqueue(Frame::pong(frame.payload)),
            OpCode::Pong | OpCode::Continuation => {
                debug!("frame ignored: opcode={}", frame.opcode);
                Flow::Continue
            }
            OpCode::Close => {
                let status = frame.close_status.unwrap_or(StatusCode::NORMAL_CLOSURE);
                self.close(status, frame.payload, CloseInitiator::Peer, outcome);
                Flow::Stop
            }
            OpCode::Text | OpCode::Binary => {
                match self.handler.on_message(frame.opcode, frame.payload).await {
                    Some(reply) => self.enqueue(Frame::new(frame.opcode, reply)),
                    None => Flow::Continue,
                }
            }
            OpCode::Reserved(_) => {
                let decision = validate(frame.opcode, StatusCode(0));
                self.close(decision.status, Bytes::new(), CloseInitiator::Error, outcome);
                Flow::Stop
            }
        }
    }

    /// Status of the close frame owed for a frame that breaks RFC 6455, if
    /// any.
    fn violation(&self, frame: &Frame) -> Option<StatusCode> {
        if frame.rsv != 0 && !self.config.reserved_bits_allowed() {
            info!("reserved bits set without extension: rsv={}", frame.rsv);
            return Some(StatusCode::PROTOCOL_ERROR);
        }
        let status_len = if frame.close_status.is_some() { 2 } else { 0 };
        let len = frame.payload.len() + status_len;
        if frame.opcode.is_control()
            && !frame.opcode.is_reserved()
            && (!frame.fin || len > MAX_CONTROL_PAYLOAD)
        {
            info!(
                "invalid control frame: opcode={}, fin={}, len={len}",
                frame.opcode, frame.fin
            );
            return Some(StatusCode::PROTOCOL_ERROR);
        }
        if frame.is_close() && frame.close_status.is_none() && !frame.payload.is_empty() {
            info!("close payload too short for a status: len={len}");
            return Some(StatusCode::PROTOCOL_ERROR);
        }
        if frame.opcode == OpCode::Text
            && self.config.utf8_validation()
            && std::str::from_utf8(&frame.payload).is_err()
        {
            info!("text frame is not valid UTF-8: len={}", frame.payload.len());
            return Some(StatusCode::INVALID_FRAME_PAYLOAD_DATA);
        }
        None
    }

    fn enqueue(&self, frame: Frame) -> Flow {
        if self.outbound.send(frame).is_err() {
            debug!("writer gone; reader stopping");
            return Flow::Stop;
        }
        Flow::Continue
    }

    /// Queue a close frame and move the session to `Closing`.
    fn close(
        &self,
        status: StatusCode,
        reason: Bytes,
        initiator: CloseInitiator,
        outcome: &mut ReaderOutcome,
    ) {
        if !self.state.begin_closing() {
            return;
        }
        info!("closing session: status={status}, initiator={initiator}");
        outcome.initiator = Some(initiator);
        self.enqueue(Frame::close(status, reason));
    }
}
