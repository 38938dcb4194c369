//! Close decisions for incoming opcode/status pairs.

use super::{OpCode, StatusCode};

/// Outcome of [`validate`]: whether the endpoint must close and with which
/// status.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CloseDecision {
    /// `true` when a close frame must be sent.
    pub must_close: bool,
    /// Status to place in the close frame. Zero when no close is required.
    pub status: StatusCode,
}

impl CloseDecision {
    /// A decision requiring a close with `status`.
    #[must_use]
    pub const fn close(status: StatusCode) -> Self {
        Self {
            must_close: true,
            status,
        }
    }

    /// A decision leaving the connection open.
    #[must_use]
    pub const fn keep_open() -> Self {
        Self {
            must_close: false,
            status: StatusCode(0),
        }
    }
}

impl From<CloseDecision> for (bool, StatusCode) {
    fn from(value: CloseDecision) -> Self { (value.must_close, value.status) }
}

/// Decide whether `opcode` forces a close and which status the close frame
/// carries.
///
/// Close frames always close; a status an endpoint may not send is rewritten
/// to [`StatusCode::PROTOCOL_ERROR`]. Reserved opcodes close with
/// [`StatusCode::PROTOCOL_ERROR`]. Everything else keeps the connection open.
///
/// The writer consults this once per outgoing close frame.
///
/// # Examples
///
/// ```
/// use wiresock::protocol::{CloseDecision, OpCode, StatusCode, validate};
///
/// assert_eq!(
///     validate(OpCode::Close, StatusCode(1005)),
///     CloseDecision::close(StatusCode::PROTOCOL_ERROR)
/// );
/// assert_eq!(
///     validate(OpCode::Text, StatusCode(0)),
///     CloseDecision::keep_open()
/// );
/// ```
#[must_use]
pub fn validate(opcode: OpCode, status: StatusCode) -> CloseDecision {
    match opcode {
        OpCode::Close if status.is_forbidden_on_wire() => {
            CloseDecision::close(StatusCode::PROTOCOL_ERROR)
        }
        OpCode::Close => CloseDecision::close(status),
        OpCode::Reserved(_) => CloseDecision::close(StatusCode::PROTOCOL_ERROR),
        _ => CloseDecision::keep_open(),
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::normal(1000, 1000)]
    #[case::below_range(5, 1002)]
    #[case::zero(0, 1002)]
    #[case::no_status(1005, 1002)]
    #[case::abnormal(1006, 1002)]
    #[case::reserved(1004, 1002)]
    #[case::protocol_error_passes_through(1002, 1002)]
    #[case::unassigned(1016, 1002)]
    #[case::application_defined(4000, 4000)]
    #[case::registered(3000, 3000)]
    #[case::too_big(1009, 1009)]
    fn close_status_legality(#[case] provided: u16, #[case] effective: u16) {
        let decision = validate(OpCode::Close, StatusCode(provided));
        assert_eq!(decision, CloseDecision::close(StatusCode(effective)));
    }

    #[rstest]
    #[case(0x3)]
    #[case(0x5)]
    #[case(0x7)]
    #[case(0xB)]
    #[case(0xC)]
    #[case(0xF)]
    fn reserved_opcodes_close_with_protocol_error(#[case] raw: u8) {
        let (must_close, status) = validate(OpCode::from(raw), StatusCode(0)).into();
        assert!(must_close);
        assert_eq!(status, StatusCode::PROTOCOL_ERROR);
    }

    #[rstest]
    #[case(OpCode::Continuation)]
    #[case(OpCode::Text)]
    #[case(OpCode::Binary)]
    #[case(OpCode::Ping)]
    #[case(OpCode::Pong)]
    fn data_and_ping_frames_keep_connection_open(#[case] opcode: OpCode) {
        assert_eq!(validate(opcode, StatusCode(1000)), CloseDecision::keep_open());
    }
}
