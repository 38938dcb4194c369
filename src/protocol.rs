//! Opcode and close-status model for RFC 6455 frames.
//!
//! [`OpCode`] tags the purpose of a frame and [`StatusCode`] carries the
//! reason a close frame ends the connection. The rules tying the two
//! together live in [`validation`].

use std::fmt;

pub mod validation;

pub use validation::{CloseDecision, validate};

/// Four-bit frame opcode.
///
/// Values `0x3..=0x7` and `0xB..=0xF` are reserved by RFC 6455 and are kept
/// as [`OpCode::Reserved`] so the session can reject them explicitly.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OpCode {
    /// `0x0`: continuation of a fragmented message.
    Continuation,
    /// `0x1`: UTF-8 text payload.
    Text,
    /// `0x2`: binary payload.
    Binary,
    /// `0x8`: connection close.
    Close,
    /// `0x9`: ping.
    Ping,
    /// `0xA`: pong.
    Pong,
    /// Any reserved opcode, holding the raw nibble.
    Reserved(u8),
}

impl OpCode {
    /// Return the on-wire nibble for this opcode.
    ///
    /// # Examples
    ///
    /// ```
    /// use wiresock::protocol::OpCode;
    ///
    /// assert_eq!(OpCode::Pong.as_u8(), 0xA);
    /// assert_eq!(OpCode::Reserved(0x5).as_u8(), 0x5);
    /// ```
    #[must_use]
    pub fn as_u8(self) -> u8 {
        match self {
            Self::Continuation => 0x0,
            Self::Text => 0x1,
            Self::Binary => 0x2,
            Self::Close => 0x8,
            Self::Ping => 0x9,
            Self::Pong => 0xA,
            Self::Reserved(raw) => raw & 0x0F,
        }
    }

    /// Returns `true` for close, ping, pong and the reserved control range.
    #[must_use]
    pub fn is_control(self) -> bool { self.as_u8() & 0x08 != 0 }

    /// Returns `true` for the reserved ranges `0x3..=0x7` and `0xB..=0xF`.
    #[must_use]
    pub fn is_reserved(self) -> bool { matches!(self, Self::Reserved(_)) }
}

impl From<u8> for OpCode {
    /// Interpret the low nibble of `value` as an opcode.
    fn from(value: u8) -> Self {
        match value & 0x0F {
            0x0 => Self::Continuation,
            0x1 => Self::Text,
            0x2 => Self::Binary,
            0x8 => Self::Close,
            0x9 => Self::Ping,
            0xA => Self::Pong,
            raw => Self::Reserved(raw),
        }
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Continuation => f.write_str("continuation"),
            Self::Text => f.write_str("text"),
            Self::Binary => f.write_str("binary"),
            Self::Close => f.write_str("close"),
            Self::Ping => f.write_str("ping"),
            Self::Pong => f.write_str("pong"),
            Self::Reserved(raw) => write!(f, "reserved({raw:#x})"),
        }
    }
}

/// Close status code from the IANA-registered space (RFC 6455 §7.4).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StatusCode(pub u16);

impl StatusCode {
    /// The purpose of the connection has been fulfilled.
    pub const NORMAL_CLOSURE: Self = Self(1000);
    /// The endpoint is going away, for example a server shutting down.
    pub const GOING_AWAY: Self = Self(1001);
    /// The endpoint is terminating the connection due to a protocol error.
    pub const PROTOCOL_ERROR: Self = Self(1002);
    /// The endpoint received a type of data it cannot accept.
    pub const UNSUPPORTED_DATA: Self = Self(1003);
    /// Reserved; meaning might be defined in the future.
    pub const RESERVED: Self = Self(1004);
    /// Designates that no status code was present. Never sent on the wire.
    pub const NO_STATUS_RECEIVED: Self = Self(1005);
    /// Designates an abnormal closure without a close frame. Never sent on
    /// the wire.
    pub const ABNORMAL_CLOSURE: Self = Self(1006);
    /// Message data was not consistent with its type, such as non-UTF-8
    /// text.
    pub const INVALID_FRAME_PAYLOAD_DATA: Self = Self(1007);
    /// A message violated endpoint policy.
    pub const POLICY_VIOLATION: Self = Self(1008);
    /// A message was too big to process.
    pub const MESSAGE_TOO_BIG: Self = Self(1009);
    /// The client expected an extension the server did not negotiate.
    pub const MANDATORY_EXTENSION: Self = Self(1010);
    /// The server hit an unexpected condition.
    pub const INTERNAL_SERVER_ERROR: Self = Self(1011);
    /// TLS handshake failure. Never sent on the wire.
    pub const TLS_HANDSHAKE: Self = Self(1015);

    /// Return the raw 16-bit value.
    #[must_use]
    pub const fn as_u16(self) -> u16 { self.0 }

    /// Returns `true` if an endpoint must not place this code in a close
    /// frame it sends.
    ///
    /// The forbidden set is `<= 999`, `1004`, `1005`, `1006` and
    /// `1016..=2999`.
    ///
    /// # Examples
    ///
    /// ```
    /// use wiresock::protocol::StatusCode;
    ///
    /// assert!(StatusCode(5).is_forbidden_on_wire());
    /// assert!(StatusCode::NO_STATUS_RECEIVED.is_forbidden_on_wire());
    /// assert!(!StatusCode::NORMAL_CLOSURE.is_forbidden_on_wire());
    /// assert!(!StatusCode(4000).is_forbidden_on_wire());
    /// ```
    #[must_use]
    pub const fn is_forbidden_on_wire(self) -> bool {
        matches!(self.0, 0..=999 | 1004..=1006 | 1016..=2999)
    }
}

impl From<u16> for StatusCode {
    fn from(value: u16) -> Self { Self(value) }
}

impl From<StatusCode> for u16 {
    fn from(value: StatusCode) -> Self { value.0 }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}
