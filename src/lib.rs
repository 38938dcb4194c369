#![doc(html_root_url = "https://docs.rs/wiresock/latest")]
//! Public API for the `wiresock` library.
//!
//! `wiresock` implements the RFC 6455 WebSocket framing layer: a streaming
//! frame decoder and an encoder, opcode and close-status validation, a
//! per-connection session that answers client frames, the opening handshake
//! and a Tokio server tying them together.

pub mod codec;
pub mod config;
pub mod frame;
pub mod handshake;
pub mod metrics;
pub mod protocol;
pub mod server;
pub mod session;

pub use codec::{CodecError, FrameReader, FramingError, encode, parse_frame};
pub use config::SessionConfig;
pub use frame::Frame;
pub use metrics::{CONNECTIONS_ACTIVE, Direction, ERRORS_TOTAL, FRAMES_PROCESSED};
pub use protocol::{OpCode, StatusCode};
pub use server::{ServerError, WebSocketServer};
pub use session::{EchoHandler, FixedReply, MessageHandler, Session, SessionOutcome};
