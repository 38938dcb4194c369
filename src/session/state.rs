//! Session lifecycle state.

use std::{
    fmt,
    sync::atomic::{AtomicU8, Ordering},
};

/// Lifecycle of a WebSocket session.
///
/// A session moves `Open → Closing → Closed` and never skips `Closing`: a
/// close frame is always queued, or its write attempted, before teardown.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    /// Frames flow in both directions.
    Open,
    /// A close frame has been received or queued.
    Closing,
    /// The close frame has been written, or writing it failed.
    Closed,
}

impl SessionState {
    const fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::Open,
            1 => Self::Closing,
            _ => Self::Closed,
        }
    }

    const fn as_u8(self) -> u8 {
        match self {
            Self::Open => 0,
            Self::Closing => 1,
            Self::Closed => 2,
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Open => "open",
            Self::Closing => "closing",
            Self::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// State shared by the reader and writer loops of one session.
#[derive(Debug)]
pub(crate) struct StateCell(AtomicU8);

impl StateCell {
    pub(crate) fn new() -> Self { Self(AtomicU8::new(SessionState::Open.as_u8())) }

    pub(crate) fn get(&self) -> SessionState { SessionState::from_u8(self.0.load(Ordering::Acquire)) }

    /// Move `Open → Closing`. Returns `true` only for the call that made the
    /// transition.
    pub(crate) fn begin_closing(&self) -> bool {
        self.0
            .compare_exchange(
                SessionState::Open.as_u8(),
                SessionState::Closing.as_u8(),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// Move to `Closed`, passing through `Closing` if still open.
    pub(crate) fn finish(&self) {
        self.begin_closing();
        self.0.store(SessionState::Closed.as_u8(), Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn begin_closing_transitions_once() {
        let state = StateCell::new();
        assert_eq!(state.get(), SessionState::Open);
        assert!(state.begin_closing());
        assert!(!state.begin_closing());
        assert_eq!(state.get(), SessionState::Closing);
    }

    #[test]
    fn finish_from_open_ends_closed() {
        let state = StateCell::new();
        state.finish();
        assert_eq!(state.get(), SessionState::Closed);
        assert!(!state.begin_closing(), "closed sessions never reopen");
    }
}
