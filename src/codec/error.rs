//! Error types for the frame codec.
//!
//! - [`FramingError`]: the bytes on the wire do not form a valid client frame.
//! - [`CodecError`]: top-level decode failure, wrapping framing errors,
//!   transport I/O errors, and a peer closing the transport at a frame
//!   boundary.
//!
//! Every decode failure is fatal to the connection. [`CodecError::close_status`]
//! names the status of the best-effort close frame sent before teardown.

use std::io;

use thiserror::Error;

use crate::protocol::StatusCode;

/// Wire-level problems in a frame's structure.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FramingError {
    /// The transport ended before a complete header arrived.
    #[error("incomplete frame header: have {have}, need {need}")]
    IncompleteHeader {
        /// Header bytes available.
        have: usize,
        /// Header bytes required at the current stage.
        need: usize,
    },

    /// A client frame arrived without the mask bit set.
    #[error("payload should be masked")]
    UnmaskedFrame,

    /// A 64-bit length had its most significant bit set.
    #[error("invalid frame length encoding")]
    InvalidLengthEncoding,

    /// The declared payload length exceeds the configured maximum.
    #[error("frame exceeds max length: {size} > {max}")]
    OversizedFrame {
        /// Length declared in the header.
        size: u64,
        /// Configured maximum.
        max: usize,
    },

    /// The transport ended before the declared payload was read.
    #[error("payload length mismatch: declared {declared}, received {received}")]
    PayloadLengthMismatch {
        /// Length declared in the header.
        declared: usize,
        /// Bytes actually unmasked.
        received: usize,
    },
}

/// Top-level decode error.
///
/// # Examples
///
/// ```
/// use wiresock::{
///     codec::{CodecError, FramingError},
///     protocol::StatusCode,
/// };
///
/// let err = CodecError::Framing(FramingError::OversizedFrame {
///     size: 2048,
///     max: 1024,
/// });
/// assert_eq!(err.close_status(), StatusCode::MESSAGE_TOO_BIG);
///
/// let err = CodecError::Framing(FramingError::UnmaskedFrame);
/// assert_eq!(err.close_status(), StatusCode::PROTOCOL_ERROR);
/// ```
#[derive(Debug, Error)]
pub enum CodecError {
    /// The bytes received do not form a valid frame.
    #[error("framing error: {0}")]
    Framing(#[from] FramingError),

    /// Reading from the transport failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The peer closed the transport cleanly between frames.
    #[error("connection closed at frame boundary")]
    ConnectionClosed,
}

impl CodecError {
    /// Status for the close frame sent in response to this error.
    #[must_use]
    pub fn close_status(&self) -> StatusCode {
        match self {
            Self::Framing(FramingError::OversizedFrame { .. }) => StatusCode::MESSAGE_TOO_BIG,
            _ => StatusCode::PROTOCOL_ERROR,
        }
    }

    /// Returns `true` if the transport can no longer be read or written.
    ///
    /// A close frame is still attempted, but failure to deliver it is
    /// expected.
    #[must_use]
    pub fn is_transport_failure(&self) -> bool {
        matches!(self, Self::Io(_) | Self::ConnectionClosed)
    }

    /// Error category for logs and metrics: `"framing"`, `"io"` or
    /// `"closed"`.
    #[must_use]
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::Framing(_) => "framing",
            Self::Io(_) => "io",
            Self::ConnectionClosed => "closed",
        }
    }
}

impl From<CodecError> for io::Error {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::Io(e) => e,
            CodecError::Framing(e) => io::Error::new(io::ErrorKind::InvalidData, e),
            CodecError::ConnectionClosed => {
                io::Error::new(io::ErrorKind::UnexpectedEof, CodecError::ConnectionClosed)
            }
        }
    }
}
