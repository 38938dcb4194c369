//! Growing read buffer shared by successive frame decodes.

use std::io;

use bytes::{Buf, BytesMut};
use log::debug;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::config::SessionConfig;

/// Bytes read from the transport but not yet consumed by the decoder.
///
/// Each frame starts with a read of `initial` bytes; every further read in
/// the same frame doubles the request, capped at `max`. The request size
/// never shrinks within a frame. Bytes left over after a frame stay
/// buffered for the next one, and header bytes are only consumed once the
/// whole header has been parsed, so no header byte is read twice.
#[derive(Debug)]
pub(crate) struct ReadCursor {
    buf: BytesMut,
    initial: usize,
    max: usize,
    read_size: usize,
    reads_in_frame: usize,
}

impl ReadCursor {
    pub(crate) fn new(config: &SessionConfig) -> Self {
        Self {
            buf: BytesMut::new(),
            initial: config.initial_read(),
            max: config.max_read(),
            read_size: config.initial_read(),
            reads_in_frame: 0,
        }
    }

    /// Seed the cursor with bytes received before the session started.
    pub(crate) fn prefill(&mut self, bytes: &[u8]) { self.buf.extend_from_slice(bytes); }

    /// Reset the read size at the start of a new frame.
    pub(crate) fn begin_frame(&mut self) {
        self.read_size = self.initial;
        self.reads_in_frame = 0;
    }

    pub(crate) fn buffered(&self) -> &[u8] { &self.buf }

    pub(crate) fn len(&self) -> usize { self.buf.len() }

    pub(crate) fn is_empty(&self) -> bool { self.buf.is_empty() }

    pub(crate) fn advance(&mut self, count: usize) { self.buf.advance(count); }

    /// Size of the most recent read request.
    #[cfg(test)]
    pub(crate) fn read_size(&self) -> usize { self.read_size }

    /// Issue one read from `reader` and append the bytes to the buffer.
    ///
    /// Returns `false` when the transport reported end of stream.
    pub(crate) async fn fill<R>(&mut self, reader: &mut R) -> io::Result<bool>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        if self.reads_in_frame > 0 && self.read_size < self.max {
            let grown = self.read_size.saturating_mul(2).min(self.max);
            debug!(
                "increasing read buffer size: old_size={}, new_size={grown}, max_size={}",
                self.read_size, self.max
            );
            self.read_size = grown;
        }
        self.reads_in_frame += 1;

        self.buf.reserve(self.read_size);
        let limit = u64::try_from(self.read_size).unwrap_or(u64::MAX);
        let read = (&mut *reader).take(limit).read_buf(&mut self.buf).await?;
        Ok(read > 0)
    }
}
