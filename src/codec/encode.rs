//! Encoder for unmasked server frames.

use std::io;

use bytes::{BufMut, Bytes, BytesMut};
use log::{log_enabled, trace};
use tokio_util::codec::Encoder;

use super::{LengthField, parse_frame};
use crate::{
    frame::Frame,
    protocol::{OpCode, StatusCode, validate},
};

/// `tokio_util` encoder writing server frames.
///
/// Plug into [`tokio_util::codec::FramedWrite`] to write and flush one frame
/// per `send`. The status of the most recent close frame is kept so callers
/// can report what went on the wire without validating it again.
#[derive(Clone, Copy, Debug, Default)]
pub struct FrameEncoder {
    last_close: Option<StatusCode>,
}

impl FrameEncoder {
    /// Status written by the most recently encoded frame, or `None` if that
    /// frame was not a close frame.
    #[must_use]
    pub const fn last_close_status(&self) -> Option<StatusCode> { self.last_close }
}

impl Encoder<Frame> for FrameEncoder {
    type Error = io::Error;

    fn encode(&mut self, item: Frame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let start = dst.len();
        self.last_close = write_frame(&item, dst);
        if log_enabled!(log::Level::Trace) {
            match parse_frame(&dst[start..]) {
                Ok(Some((parsed, _))) => trace!("encoded frame: frame={parsed:?}"),
                Ok(None) => trace!("encoded frame is incomplete: bytes={}", dst.len() - start),
                Err(e) => trace!("encoded frame failed to parse back: error={e}"),
            }
        }
        Ok(())
    }
}

/// Encode `frame` as a server frame.
///
/// Byte 0 is `0x80 | opcode`. The length field uses the smallest of the
/// three RFC 6455 encodings. A close frame carries its status, passed
/// through [`validate`], directly after the length field; a close frame
/// without a status is sent as [`StatusCode::NORMAL_CLOSURE`]. The payload
/// is never masked and the output is sized exactly.
///
/// # Examples
///
/// ```
/// use wiresock::{codec::encode, frame::Frame, protocol::StatusCode};
///
/// assert_eq!(&encode(&Frame::text("Hi"))[..], &[0x81, 0x02, b'H', b'i']);
///
/// // 1005 may not be sent, so it is rewritten to 1002 (0x03EA).
/// let close = encode(&Frame::close(StatusCode::NO_STATUS_RECEIVED, ""));
/// assert_eq!(&close[..], &[0x88, 0x02, 0x03, 0xEA]);
/// ```
#[must_use]
pub fn encode(frame: &Frame) -> Bytes {
    let mut dst = BytesMut::new();
    let _ = write_frame(frame, &mut dst);
    dst.freeze()
}

/// Status written for a close frame: the requested status, defaulting to
/// `1000`, after [`validate`].
fn close_status_on_wire(frame: &Frame) -> StatusCode {
    let requested = frame.close_status.unwrap_or(StatusCode::NORMAL_CLOSURE);
    validate(OpCode::Close, requested).status
}

/// Append `frame` to `dst`, returning the close status written, if any.
fn write_frame(frame: &Frame, dst: &mut BytesMut) -> Option<StatusCode> {
    let status = frame.is_close().then(|| close_status_on_wire(frame));
    let payload_len = frame.wire_payload_len();
    let field = LengthField::for_len(payload_len);

    dst.reserve(2 + field.extra_bytes() + payload_len);
    dst.put_u8(0x80 | frame.opcode.as_u8());
    dst.put_u8(field.base());
    match field {
        LengthField::Short(_) => {}
        LengthField::Medium(len) => dst.put_u16(len),
        LengthField::Long(len) => dst.put_u64(len),
    }
    if let Some(status) = status {
        dst.put_u16(status.as_u16());
    }
    dst.extend_from_slice(&frame.payload);
    status
}
