//! Streaming decoder for masked client frames.

use bytes::{Bytes, BytesMut};
use tokio::io::AsyncRead;

use super::{
    CodecError,
    FramingError,
    Header,
    HeaderStatus,
    apply_mask,
    cursor::ReadCursor,
};
use crate::{config::SessionConfig, frame::Frame};

/// Reads client frames from the read half of a transport.
///
/// # Examples
///
/// ```
/// use wiresock::{codec::FrameReader, config::SessionConfig, protocol::OpCode};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), wiresock::codec::CodecError> {
/// // A masked text frame carrying "Hi" with key 01 02 03 04.
/// let wire: &[u8] = &[0x81, 0x82, 1, 2, 3, 4, b'H' ^ 1, b'i' ^ 2];
/// let mut reader = FrameReader::new(wire, &SessionConfig::default());
/// let frame = reader.read_frame().await?;
/// assert_eq!(frame.opcode, OpCode::Text);
/// assert_eq!(&frame.payload[..], b"Hi");
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct FrameReader<R> {
    reader: R,
    cursor: ReadCursor,
    max_payload: usize,
}

impl<R> FrameReader<R>
where
    R: AsyncRead + Unpin,
{
    /// Wrap `reader` using the limits in `config`.
    #[must_use]
    pub fn new(reader: R, config: &SessionConfig) -> Self {
        Self {
            reader,
            cursor: ReadCursor::new(config),
            max_payload: config.max_payload(),
        }
    }

    /// Queue bytes that were read from the transport before the session
    /// started, such as data trailing the HTTP upgrade request.
    #[must_use]
    pub fn with_prefetched(mut self, bytes: &[u8]) -> Self {
        self.cursor.prefill(bytes);
        self
    }

    /// Release the underlying reader. Buffered bytes are discarded.
    pub fn into_inner(self) -> R { self.reader }

    /// Decode the next frame.
    ///
    /// # Errors
    ///
    /// - [`CodecError::ConnectionClosed`] if the transport ends before any byte of the frame.
    /// - [`CodecError::Framing`] for a truncated header, a missing mask bit, an invalid or
    ///   oversized length, or a payload cut short by end of stream.
    /// - [`CodecError::Io`] if a transport read fails.
    pub async fn read_frame(&mut self) -> Result<Frame, CodecError> {
        self.cursor.begin_frame();
        let header = self.read_header().await?;
        tracing::debug!(
            header_size = header.len,
            fin = header.fin,
            rsv = header.rsv,
            opcode = %header.opcode,
            masked = header.mask.is_some(),
            payload_length = header.payload_len,
            "frame header parsed"
        );

        let declared = usize::try_from(header.payload_len)
            .ok()
            .filter(|len| *len <= self.max_payload)
            .ok_or(FramingError::OversizedFrame {
                size: header.payload_len,
                max: self.max_payload,
            })?;
        let Some(mask) = header.mask else {
            return Err(FramingError::UnmaskedFrame.into());
        };
        self.cursor.advance(header.len);

        let payload = self.read_payload(declared, mask).await?;
        let frame = header.into_frame(payload);
        if let Some(status) = frame.close_status {
            tracing::debug!(status_code = status.as_u16(), "close frame status parsed");
        }
        Ok(frame)
    }

    async fn read_header(&mut self) -> Result<Header, CodecError> {
        loop {
            match Header::parse(self.cursor.buffered(), true)? {
                HeaderStatus::Complete(header) => return Ok(header),
                HeaderStatus::Incomplete { need } => {
                    if !self.cursor.fill(&mut self.reader).await? {
                        let have = self.cursor.len();
                        if have == 0 {
                            return Err(CodecError::ConnectionClosed);
                        }
                        return Err(FramingError::IncompleteHeader { have, need }.into());
                    }
                }
            }
        }
    }

    /// Copy and unmask `declared` payload bytes, reading more from the
    /// transport whenever the cursor runs dry.
    ///
    /// The payload buffer grows with the bytes actually received, so a
    /// header alone never reserves the declared length.
    async fn read_payload(&mut self, declared: usize, mask: [u8; 4]) -> Result<Bytes, CodecError> {
        let mut payload = BytesMut::with_capacity(declared.min(self.cursor.len()));
        while payload.len() < declared {
            if self.cursor.is_empty() && !self.cursor.fill(&mut self.reader).await? {
                break;
            }
            let start = payload.len();
            let take = self.cursor.len().min(declared - start);
            payload.reserve(take);
            payload.extend_from_slice(&self.cursor.buffered()[..take]);
            self.cursor.advance(take);
            apply_mask(&mut payload[start..], mask, start);
        }

        if payload.len() != declared {
            return Err(FramingError::PayloadLengthMismatch {
                declared,
                received: payload.len(),
            }
            .into());
        }
        Ok(payload.freeze())
    }
}
