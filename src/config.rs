//! Per-session configuration.
//!
//! [`SessionConfig`] bounds the read-side buffer growth and the largest
//! payload a peer may declare, and toggles the optional RFC checks applied
//! by the session reader.

/// Initial size of a frame's first transport read (4 KiB).
pub const DEFAULT_READ_SIZE: usize = 4096;

/// Cap on the doubling read size (1 MiB).
pub const MAX_READ_SIZE: usize = 1024 * 1024;

/// Smallest read size accepted by [`SessionConfig::initial_read_size`].
pub const MIN_READ_SIZE: usize = 64;

/// Default ceiling on a declared payload length (16 MiB).
pub const DEFAULT_MAX_PAYLOAD_LENGTH: usize = 16 * 1024 * 1024;

/// Hard ceiling on [`SessionConfig::max_payload_length`] (256 MiB).
pub const MAX_PAYLOAD_LENGTH: usize = 256 * 1024 * 1024;

/// Largest payload a control frame may carry.
pub const MAX_CONTROL_PAYLOAD: usize = 125;

/// Limits and toggles applied to a single WebSocket session.
///
/// # Examples
///
/// ```
/// use wiresock::config::SessionConfig;
///
/// let config = SessionConfig::default()
///     .max_payload_length(64 * 1024)
///     .validate_utf8(false);
/// assert_eq!(config.max_payload(), 64 * 1024);
/// assert_eq!(config.initial_read(), 4096);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionConfig {
    initial_read_size: usize,
    max_read_size: usize,
    max_payload_length: usize,
    allow_reserved_bits: bool,
    validate_utf8: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            initial_read_size: DEFAULT_READ_SIZE,
            max_read_size: MAX_READ_SIZE,
            max_payload_length: DEFAULT_MAX_PAYLOAD_LENGTH,
            allow_reserved_bits: false,
            validate_utf8: true,
        }
    }
}

impl SessionConfig {
    /// Set the size of the first read issued for each frame.
    ///
    /// Clamped to `MIN_READ_SIZE..=max_read_size`.
    #[must_use]
    pub fn initial_read_size(mut self, size: usize) -> Self {
        self.initial_read_size = size.clamp(MIN_READ_SIZE, self.max_read_size);
        self
    }

    /// Set the cap on read-size growth.
    ///
    /// Clamped to `MIN_READ_SIZE..=MAX_READ_SIZE`. Lowers the initial read
    /// size when it would exceed the new cap.
    #[must_use]
    pub fn max_read_size(mut self, size: usize) -> Self {
        self.max_read_size = size.clamp(MIN_READ_SIZE, MAX_READ_SIZE);
        self.initial_read_size = self.initial_read_size.min(self.max_read_size);
        self
    }

    /// Set the largest payload length a peer may declare.
    ///
    /// Clamped to `MAX_CONTROL_PAYLOAD..=MAX_PAYLOAD_LENGTH`.
    #[must_use]
    pub fn max_payload_length(mut self, length: usize) -> Self {
        self.max_payload_length = length.clamp(MAX_CONTROL_PAYLOAD, MAX_PAYLOAD_LENGTH);
        self
    }

    /// Accept frames with non-zero RSV bits instead of closing with a
    /// protocol error.
    #[must_use]
    pub fn allow_reserved_bits(mut self, allow: bool) -> Self {
        self.allow_reserved_bits = allow;
        self
    }

    /// Close with `1007` when a text payload is not valid UTF-8.
    #[must_use]
    pub fn validate_utf8(mut self, validate: bool) -> Self {
        self.validate_utf8 = validate;
        self
    }

    /// Size of the first read issued for each frame.
    #[must_use]
    pub const fn initial_read(&self) -> usize { self.initial_read_size }

    /// Cap on read-size growth.
    #[must_use]
    pub const fn max_read(&self) -> usize { self.max_read_size }

    /// Largest payload length a peer may declare.
    #[must_use]
    pub const fn max_payload(&self) -> usize { self.max_payload_length }

    /// Whether non-zero RSV bits are tolerated.
    #[must_use]
    pub const fn reserved_bits_allowed(&self) -> bool { self.allow_reserved_bits }

    /// Whether text payloads are checked for UTF-8.
    #[must_use]
    pub const fn utf8_validation(&self) -> bool { self.validate_utf8 }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(1, MIN_READ_SIZE)]
    #[case(8192, 8192)]
    #[case(usize::MAX, MAX_READ_SIZE)]
    fn initial_read_size_is_clamped(#[case] requested: usize, #[case] expected: usize) {
        let config = SessionConfig::default().initial_read_size(requested);
        assert_eq!(config.initial_read(), expected);
    }

    #[test]
    fn lowering_max_read_size_lowers_initial_read_size() {
        let config = SessionConfig::default().max_read_size(1024);
        assert_eq!(config.max_read(), 1024);
        assert_eq!(config.initial_read(), 1024);
    }

    #[rstest]
    #[case(0, MAX_CONTROL_PAYLOAD)]
    #[case(70_000, 70_000)]
    #[case(usize::MAX, MAX_PAYLOAD_LENGTH)]
    fn max_payload_length_is_clamped(#[case] requested: usize, #[case] expected: usize) {
        let config = SessionConfig::default().max_payload_length(requested);
        assert_eq!(config.max_payload(), expected);
    }

    #[test]
    fn defaults_reject_reserved_bits_and_check_utf8() {
        let config = SessionConfig::default();
        assert!(!config.reserved_bits_allowed());
        assert!(config.utf8_validation());
        assert_eq!(config.max_read(), MAX_READ_SIZE);
        assert_eq!(config.max_payload(), DEFAULT_MAX_PAYLOAD_LENGTH);
    }
}
