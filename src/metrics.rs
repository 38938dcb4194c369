//! Metric helpers for `wiresock`.
//!
//! This module defines metric names and simple helper functions
//! wrapping the [`metrics`](https://docs.rs/metrics) crate. With the
//! `metrics` feature disabled every helper is a no-op.

#[cfg(feature = "metrics")]
use metrics::{counter, gauge};

use crate::protocol::StatusCode;

/// Name of the gauge tracking active sessions.
pub const CONNECTIONS_ACTIVE: &str = "wiresock_connections_active";
/// Name of the counter tracking processed frames.
pub const FRAMES_PROCESSED: &str = "wiresock_frames_processed_total";
/// Name of the counter tracking close frames written.
pub const CLOSE_FRAMES: &str = "wiresock_close_frames_total";
/// Name of the counter tracking error occurrences.
pub const ERRORS_TOTAL: &str = "wiresock_errors_total";
/// Name of the counter tracking panics in connection tasks.
pub const CONNECTION_PANICS: &str = "wiresock_connection_panics_total";

/// Direction of frame processing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    /// Frames decoded from a client.
    Inbound,
    /// Frames written to a client.
    Outbound,
}

impl Direction {
    /// Label value used for the `direction` label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Direction::Inbound => "inbound",
            Direction::Outbound => "outbound",
        }
    }
}

/// Increment the active connections gauge.
#[cfg(feature = "metrics")]
pub fn inc_connections() { gauge!(CONNECTIONS_ACTIVE).increment(1.0); }

/// Decrement the active connections gauge.
#[cfg(feature = "metrics")]
pub fn dec_connections() { gauge!(CONNECTIONS_ACTIVE).decrement(1.0); }

/// Record a processed frame for the given direction.
#[cfg(feature = "metrics")]
pub fn inc_frames(direction: Direction) {
    counter!(FRAMES_PROCESSED, "direction" => direction.as_str()).increment(1);
}

/// Record a close frame written with `status`.
#[cfg(feature = "metrics")]
pub fn inc_close_frames(status: StatusCode) {
    counter!(CLOSE_FRAMES, "status" => status.as_u16().to_string()).increment(1);
}

/// Record an error of the given kind, such as `"framing"` or `"io"`.
#[cfg(feature = "metrics")]
pub fn inc_errors(kind: &'static str) { counter!(ERRORS_TOTAL, "kind" => kind).increment(1); }

/// Record a panic inside a connection task.
#[cfg(feature = "metrics")]
pub fn inc_connection_panics() { counter!(CONNECTION_PANICS).increment(1); }

#[cfg(not(feature = "metrics"))]
pub fn inc_connections() {}

#[cfg(not(feature = "metrics"))]
pub fn dec_connections() {}

#[cfg(not(feature = "metrics"))]
pub fn inc_frames(_direction: Direction) {}

#[cfg(not(feature = "metrics"))]
pub fn inc_close_frames(_status: StatusCode) {}

#[cfg(not(feature = "metrics"))]
pub fn inc_errors(_kind: &'static str) {}

#[cfg(not(feature = "metrics"))]
pub fn inc_connection_panics() {}
