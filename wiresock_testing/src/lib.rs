//! Utilities for driving a [`Session`](wiresock::session::Session) with
//! in-memory streams during tests.
//!
//! Client frames are built with [`ClientFrame`], which masks payloads the
//! way a browser would. [`drive_session`] runs a session on a
//! `tokio::io::duplex` stream, writes the scripted client bytes and returns
//! every server frame for assertions.
//!
//! ```rust
//! use wiresock::{protocol::OpCode, session::{EchoHandler, Session}};
//! use wiresock_testing::{ClientFrame, drive_session};
//!
//! # async fn demo() -> std::io::Result<()> {
//! let run = drive_session(
//!     Session::new(EchoHandler),
//!     vec![ClientFrame::text("hi").encode(), ClientFrame::close(1000).encode()],
//! )
//! .await?;
//! assert_eq!(run.frames[0].opcode, OpCode::Text);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod drive;
pub mod net;

pub use client::{ClientFrame, DEFAULT_MASK};
pub use drive::{DriveResult, drive_session, drive_session_with_capacity, server_frames};
pub use net::{SAMPLE_KEY, TestResult, connect_and_upgrade, handshake_request, unused_listener};
