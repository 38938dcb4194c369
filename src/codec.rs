//! RFC 6455 §5.2 frame codec.
//!
//! Inbound client frames are read with [`FrameReader`], which pulls bytes
//! from the transport through a growing read cursor: the first read of a
//! frame requests [`crate::config::DEFAULT_READ_SIZE`] bytes and each further
//! read within the same frame doubles the request up to
//! [`crate::config::MAX_READ_SIZE`]. Payload bytes are unmasked as they are
//! copied out of the cursor, so large payloads never sit in the read buffer
//! in full.
//!
//! Outbound server frames are produced by [`FrameEncoder`] (a
//! `tokio_util` [`Encoder`](tokio_util::codec::Encoder)) or the standalone
//! [`encode`] function. Server frames are never masked and always carry
//! `fin = 1`.
//!
//! [`parse_frame`] parses one frame out of a complete in-memory buffer and is
//! used to inspect encoded frames.

pub mod error;

mod cursor;
mod decode;
mod encode;
mod parse;

pub use decode::FrameReader;
pub use encode::{FrameEncoder, encode};
pub use error::{CodecError, FramingError};
pub use parse::parse_frame;

use bytes::Bytes;

use crate::{
    frame::Frame,
    protocol::{OpCode, StatusCode},
};

/// Largest payload length encoded in the 7-bit base length field.
const MAX_SHORT_LENGTH: u8 = 125;
/// Base length marker for a 16-bit extended length.
const MEDIUM_LENGTH_MARKER: u8 = 126;
/// Base length marker for a 64-bit extended length.
const LONG_LENGTH_MARKER: u8 = 127;

/// Encoding chosen for a payload length field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LengthField {
    /// Length `<= 125` stored in the base length bits.
    Short(u8),
    /// Length `126..=65535` stored in 2 extra bytes.
    Medium(u16),
    /// Length `> 65535` stored in 8 extra bytes.
    Long(u64),
}

impl LengthField {
    /// Select the smallest encoding able to hold `len`.
    ///
    /// # Examples
    ///
    /// ```
    /// use wiresock::codec::LengthField;
    ///
    /// assert_eq!(LengthField::for_len(125), LengthField::Short(125));
    /// assert_eq!(LengthField::for_len(126), LengthField::Medium(126));
    /// assert_eq!(LengthField::for_len(65_536), LengthField::Long(65_536));
    /// ```
    #[must_use]
    pub fn for_len(len: usize) -> Self {
        if let Ok(short) = u8::try_from(len)
            && short <= MAX_SHORT_LENGTH
        {
            Self::Short(short)
        } else if let Ok(medium) = u16::try_from(len) {
            Self::Medium(medium)
        } else {
            Self::Long(u64::try_from(len).unwrap_or(u64::MAX))
        }
    }

    /// Bytes following the second header byte.
    #[must_use]
    pub const fn extra_bytes(self) -> usize {
        match self {
            Self::Short(_) => 0,
            Self::Medium(_) => 2,
            Self::Long(_) => 8,
        }
    }

    /// Value of the 7-bit base length field.
    #[must_use]
    pub const fn base(self) -> u8 {
        match self {
            Self::Short(len) => len,
            Self::Medium(_) => MEDIUM_LENGTH_MARKER,
            Self::Long(_) => LONG_LENGTH_MARKER,
        }
    }
}

/// A fully parsed frame header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Header {
    pub fin: bool,
    pub rsv: u8,
    pub opcode: OpCode,
    pub mask: Option<[u8; 4]>,
    pub payload_len: u64,
    /// Header size in bytes, masking key included.
    pub len: usize,
}

/// Result of attempting to parse a header from buffered bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum HeaderStatus {
    Complete(Header),
    /// At least `need` bytes must be buffered before parsing can finish.
    Incomplete {
        need: usize,
    },
}

impl Header {
    /// Parse a header from the start of `buf` without consuming anything.
    ///
    /// `require_mask` rejects frames whose mask bit is clear as soon as the
    /// second byte is available.
    pub(crate) fn parse(buf: &[u8], require_mask: bool) -> Result<HeaderStatus, FramingError> {
        let [b0, b1, rest @ ..] = buf else {
            return Ok(HeaderStatus::Incomplete { need: 2 });
        };
        let masked = b1 & 0x80 != 0;
        if require_mask && !masked {
            return Err(FramingError::UnmaskedFrame);
        }
        let base = b1 & 0x7F;
        let extra = match base {
            MEDIUM_LENGTH_MARKER => 2,
            LONG_LENGTH_MARKER => 8,
            _ => 0,
        };
        let mask_len = if masked { 4 } else { 0 };
        let len = 2 + extra + mask_len;
        if buf.len() < len {
            return Ok(HeaderStatus::Incomplete { need: len });
        }

        let payload_len = match base {
            MEDIUM_LENGTH_MARKER => u64::from(u16::from_be_bytes([rest[0], rest[1]])),
            LONG_LENGTH_MARKER => {
                let mut raw = [0u8; 8];
                raw.copy_from_slice(&rest[..8]);
                let value = u64::from_be_bytes(raw);
                if value >> 63 != 0 {
                    return Err(FramingError::InvalidLengthEncoding);
                }
                value
            }
            short => u64::from(short),
        };
        let mask = masked.then(|| {
            let mut key = [0u8; 4];
            key.copy_from_slice(&rest[extra..extra + 4]);
            key
        });

        Ok(HeaderStatus::Complete(Header {
            fin: b0 & 0x80 != 0,
            rsv: (b0 >> 4) & 0x07,
            opcode: OpCode::from(*b0),
            mask,
            payload_len,
            len,
        }))
    }

    /// Combine this header with its unmasked payload, splitting the status
    /// off a close payload.
    pub(crate) fn into_frame(self, mut payload: Bytes) -> Frame {
        let close_status = if self.opcode == OpCode::Close && payload.len() >= 2 {
            let status = payload.split_to(2);
            Some(StatusCode(u16::from_be_bytes([status[0], status[1]])))
        } else {
            None
        };
        Frame {
            fin: self.fin,
            rsv: self.rsv,
            opcode: self.opcode,
            payload,
            close_status,
        }
    }
}

/// XOR `data` with `key`, where `data[0]` is payload byte number `offset`.
///
/// Applying the same mask twice restores the input, so this both masks and
/// unmasks.
///
/// # Examples
///
/// ```
/// use wiresock::codec::apply_mask;
///
/// let key = [1, 2, 3, 4];
/// let mut data = *b"hello";
/// apply_mask(&mut data, key, 0);
/// assert_ne!(&data, b"hello");
///
/// // Unmask in two pieces; the second continues at offset 2.
/// let (head, tail) = data.split_at_mut(2);
/// apply_mask(head, key, 0);
/// apply_mask(tail, key, 2);
/// assert_eq!(&data, b"hello");
/// ```
pub fn apply_mask(data: &mut [u8], key: [u8; 4], offset: usize) {
    for (i, byte) in data.iter_mut().enumerate() {
        *byte ^= key[(offset + i) & 3];
    }
}
