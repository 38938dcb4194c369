//! The frame exchanged in both directions of a WebSocket connection.

use bytes::Bytes;

use crate::protocol::{OpCode, StatusCode};

/// One RFC 6455 frame.
///
/// Inbound frames keep the header bits as received. Outbound frames are
/// always written with `fin` set and no reserved bits; see
/// [`crate::codec::encode`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    /// Whether this frame completes a message.
    pub fin: bool,
    /// The three reserved header bits (RSV1..RSV3) as a value in `0..=7`.
    pub rsv: u8,
    /// Frame opcode.
    pub opcode: OpCode,
    /// Unmasked payload. For close frames this is the reason text only; the
    /// status lives in [`Frame::close_status`].
    pub payload: Bytes,
    /// Status carried by a close frame, when present.
    pub close_status: Option<StatusCode>,
}

impl Frame {
    /// Build a final, non-close frame.
    #[must_use]
    pub fn new(opcode: OpCode, payload: impl Into<Bytes>) -> Self {
        Self {
            fin: true,
            rsv: 0,
            opcode,
            payload: payload.into(),
            close_status: None,
        }
    }

    /// Build a text frame.
    #[must_use]
    pub fn text(payload: impl Into<Bytes>) -> Self { Self::new(OpCode::Text, payload) }

    /// Build a binary frame.
    #[must_use]
    pub fn binary(payload: impl Into<Bytes>) -> Self { Self::new(OpCode::Binary, payload) }

    /// Build a ping frame.
    #[must_use]
    pub fn ping(payload: impl Into<Bytes>) -> Self { Self::new(OpCode::Ping, payload) }

    /// Build a pong frame.
    #[must_use]
    pub fn pong(payload: impl Into<Bytes>) -> Self { Self::new(OpCode::Pong, payload) }

    /// Build a close frame carrying `status` and an optional reason.
    ///
    /// # Examples
    ///
    /// ```
    /// use wiresock::{
    ///     frame::Frame,
    ///     protocol::{OpCode, StatusCode},
    /// };
    ///
    /// let frame = Frame::close(StatusCode::GOING_AWAY, "bye");
    /// assert_eq!(frame.opcode, OpCode::Close);
    /// assert_eq!(frame.close_status, Some(StatusCode::GOING_AWAY));
    /// assert_eq!(frame.reason(), Some("bye"));
    /// ```
    #[must_use]
    pub fn close(status: StatusCode, reason: impl Into<Bytes>) -> Self {
        Self {
            close_status: Some(status),
            ..Self::new(OpCode::Close, reason)
        }
    }

    /// Returns `true` if this is a close frame.
    #[must_use]
    pub fn is_close(&self) -> bool { self.opcode == OpCode::Close }

    /// Close reason as UTF-8, if this is a close frame with a valid reason.
    #[must_use]
    pub fn reason(&self) -> Option<&str> {
        if self.is_close() {
            std::str::from_utf8(&self.payload).ok()
        } else {
            None
        }
    }

    /// Number of payload bytes declared on the wire, including the two
    /// status bytes of a close frame.
    #[must_use]
    pub fn wire_payload_len(&self) -> usize {
        let status = if self.is_close() { 2 } else { 0 };
        self.payload.len() + status
    }
}
