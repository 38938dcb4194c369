//! Builder for masked client-to-server frames.

use bytes::{BufMut, Bytes, BytesMut};
use wiresock::{
    codec::{LengthField, apply_mask},
    protocol::OpCode,
};

/// Mask key used when none is chosen.
pub const DEFAULT_MASK: [u8; 4] = [0x12, 0x34, 0x56, 0x78];

/// A frame as a client would send it.
///
/// Header bits can be set freely, including values a conforming client
/// would never send, so tests can exercise the server's checks.
#[derive(Clone, Debug)]
pub struct ClientFrame {
    fin: bool,
    rsv: u8,
    opcode: u8,
    payload: Bytes,
    mask: Option<[u8; 4]>,
}

impl ClientFrame {
    /// A final frame with `opcode` and `payload`, masked with [`DEFAULT_MASK`].
    pub fn new(opcode: OpCode, payload: impl Into<Bytes>) -> Self {
        Self::raw(opcode.as_u8(), payload)
    }

    /// Like [`ClientFrame::new`] but with an arbitrary 4-bit opcode.
    pub fn raw(opcode: u8, payload: impl Into<Bytes>) -> Self {
        Self {
            fin: true,
            rsv: 0,
            opcode: opcode & 0x0F,
            payload: payload.into(),
            mask: Some(DEFAULT_MASK),
        }
    }

    pub fn text(payload: impl Into<Bytes>) -> Self { Self::new(OpCode::Text, payload) }

    pub fn binary(payload: impl Into<Bytes>) -> Self { Self::new(OpCode::Binary, payload) }

    pub fn ping(payload: impl Into<Bytes>) -> Self { Self::new(OpCode::Ping, payload) }

    pub fn pong(payload: impl Into<Bytes>) -> Self { Self::new(OpCode::Pong, payload) }

    /// A close frame carrying `status` and no reason.
    pub fn close(status: u16) -> Self { Self::close_with_reason(status, "") }

    /// A close frame carrying `status` and `reason`.
    pub fn close_with_reason(status: u16, reason: &str) -> Self {
        let mut payload = BytesMut::with_capacity(2 + reason.len());
        payload.put_u16(status);
        payload.put_slice(reason.as_bytes());
        Self::new(OpCode::Close, payload.freeze())
    }

    /// A close frame with an empty payload.
    pub fn empty_close() -> Self { Self::new(OpCode::Close, Bytes::new()) }

    #[must_use]
    pub fn fin(mut self, fin: bool) -> Self {
        self.fin = fin;
        self
    }

    /// Set the RSV1..RSV3 bits from the low three bits of `rsv`.
    #[must_use]
    pub fn rsv(mut self, rsv: u8) -> Self {
        self.rsv = rsv & 0x07;
        self
    }

    #[must_use]
    pub fn mask(mut self, key: [u8; 4]) -> Self {
        self.mask = Some(key);
        self
    }

    /// Send the payload without a mask, which servers must reject.
    #[must_use]
    pub fn unmasked(mut self) -> Self {
        self.mask = None;
        self
    }

    /// Encode the frame to wire bytes.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = BytesMut::with_capacity(14 + self.payload.len());
        out.put_u8((u8::from(self.fin) << 7) | (self.rsv << 4) | self.opcode);
        let mask_bit = if self.mask.is_some() { 0x80 } else { 0 };
        let field = LengthField::for_len(self.payload.len());
        out.put_u8(mask_bit | field.base());
        match field {
            LengthField::Short(_) => {}
            LengthField::Medium(len) => out.put_u16(len),
            LengthField::Long(len) => out.put_u64(len),
        }
        let mut body = self.payload.to_vec();
        if let Some(key) = self.mask {
            out.put_slice(&key);
            apply_mask(&mut body, key, 0);
        }
        out.put_slice(&body);
        out.to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_masks_payload() {
        let wire = ClientFrame::text("abc").mask([1, 1, 1, 1]).encode();
        assert_eq!(wire, vec![0x81, 0x83, 1, 1, 1, 1, b'a' ^ 1, b'b' ^ 1, b'c' ^ 1]);
    }

    #[test]
    fn header_bits_are_configurable() {
        let wire = ClientFrame::ping("").fin(false).rsv(0b100).unmasked().encode();
        assert_eq!(wire, vec![0x49, 0x00]);
    }
}
