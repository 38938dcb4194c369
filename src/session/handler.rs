//! Application hook deciding how data frames are answered.

use async_trait::async_trait;
use bytes::Bytes;

use crate::protocol::OpCode;

/// Chooses the reply to each text or binary frame.
///
/// The session sends the returned payload back with the same opcode as the
/// inbound frame. Returning `None` sends nothing.
///
/// # Examples
///
/// ```
/// use async_trait::async_trait;
/// use bytes::Bytes;
/// use wiresock::{protocol::OpCode, session::MessageHandler};
///
/// struct Upper;
///
/// #[async_trait]
/// impl MessageHandler for Upper {
///     async fn on_message(&self, _opcode: OpCode, payload: Bytes) -> Option<Bytes> {
///         Some(Bytes::from(payload.to_ascii_uppercase()))
///     }
/// }
/// ```
#[async_trait]
pub trait MessageHandler: Send + Sync {
    /// Produce the reply payload for a text or binary frame.
    async fn on_message(&self, opcode: OpCode, payload: Bytes) -> Option<Bytes>;
}

/// Replies with the payload it received.
#[derive(Clone, Copy, Debug, Default)]
pub struct EchoHandler;

#[async_trait]
impl MessageHandler for EchoHandler {
    async fn on_message(&self, _opcode: OpCode, payload: Bytes) -> Option<Bytes> { Some(payload) }
}

/// Replies to every message with the same payload.
#[derive(Clone, Debug)]
pub struct FixedReply(Bytes);

impl FixedReply {
    /// Reply with `payload` regardless of what arrives.
    #[must_use]
    pub fn new(payload: impl Into<Bytes>) -> Self { Self(payload.into()) }
}

impl Default for FixedReply {
    fn default() -> Self { Self::new("received message well, this is a text from server") }
}

#[async_trait]
impl MessageHandler for FixedReply {
    async fn on_message(&self, _opcode: OpCode, _payload: Bytes) -> Option<Bytes> {
        Some(self.0.clone())
    }
}

#[async_trait]
impl<H> MessageHandler for std::sync::Arc<H>
where
    H: MessageHandler + ?Sized,
{
    async fn on_message(&self, opcode: OpCode, payload: Bytes) -> Option<Bytes> {
        (**self).on_message(opcode, payload).await
    }
}
