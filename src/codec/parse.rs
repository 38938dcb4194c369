//! One-shot parsing of a frame held entirely in memory.

use bytes::Bytes;

use super::{FramingError, Header, HeaderStatus, apply_mask};
use crate::frame::Frame;

/// Parse one frame from the start of `buf`.
///
/// Both masked (client) and unmasked (server) frames are accepted. Returns
/// the frame and the number of bytes it occupied, or `Ok(None)` when `buf`
/// does not yet hold the whole frame.
///
/// # Errors
///
/// Returns [`FramingError::InvalidLengthEncoding`] for a 64-bit length with
/// its top bit set, or [`FramingError::OversizedFrame`] when the declared
/// length does not fit in memory.
///
/// # Examples
///
/// ```
/// use wiresock::{
///     codec::{encode, parse_frame},
///     frame::Frame,
/// };
///
/// let wire = encode(&Frame::binary(vec![7u8; 300]));
/// let (frame, used) = parse_frame(&wire)?.expect("complete frame");
/// assert_eq!(used, wire.len());
/// assert_eq!(frame.payload.len(), 300);
/// assert!(parse_frame(&wire[..10])?.is_none());
/// # Ok::<(), wiresock::codec::FramingError>(())
/// ```
pub fn parse_frame(buf: &[u8]) -> Result<Option<(Frame, usize)>, FramingError> {
    let header = match Header::parse(buf, false)? {
        HeaderStatus::Complete(header) => header,
        HeaderStatus::Incomplete { .. } => return Ok(None),
    };
    let payload_len = usize::try_from(header.payload_len).map_err(|_| {
        FramingError::OversizedFrame {
            size: header.payload_len,
            max: usize::MAX,
        }
    })?;
    let Some(total) = header.len.checked_add(payload_len) else {
        return Err(FramingError::OversizedFrame {
            size: header.payload_len,
            max: usize::MAX - header.len,
        });
    };
    let Some(raw) = buf.get(header.len..total) else {
        return Ok(None);
    };

    let mut payload = raw.to_vec();
    if let Some(mask) = header.mask {
        apply_mask(&mut payload, mask, 0);
    }
    Ok(Some((header.into_frame(Bytes::from(payload)), total)))
}
