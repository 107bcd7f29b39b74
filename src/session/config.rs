// ABOUTME: Session configuration for inbound frame limits and raw frame tracing
// ABOUTME: Builder-style setters in the same shape as the keep-alive configuration

use crate::codec::{MAX_PDU_SIZE, MIN_FRAME_SIZE};

/// Configuration for a [`Session`](crate::Session) and its connection.
///
/// # Example
///
/// ```rust
/// use smpp_session::SessionConfig;
///
/// // Defaults: 64KB frames, no frame dumps
/// let config = SessionConfig::default();
///
/// let config = SessionConfig::new()
///     .with_max_pdu_size(4096)
///     .with_frame_tracing(true);
/// assert_eq!(config.max_pdu_size, 4096);
/// ```
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Largest command_length accepted from the peer (default: 65536)
    ///
    /// Frames declaring more than this are rejected as soon as their length
    /// prefix is read, before any body bytes are awaited.
    pub max_pdu_size: u32,

    /// Dump every frame read or written as hex (default: false)
    ///
    /// Dumps go to the `smpp_session::wire` tracing target at TRACE level and
    /// still need a subscriber that enables it.
    pub trace_frames: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_pdu_size: MAX_PDU_SIZE,
            trace_frames: false,
        }
    }
}

impl SessionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the inbound frame ceiling
    ///
    /// Values below the 16 byte header are raised to it, since no valid
    /// frame is smaller.
    pub fn with_max_pdu_size(mut self, max_pdu_size: u32) -> Self {
        self.max_pdu_size = max_pdu_size.max(MIN_FRAME_SIZE as u32);
        self
    }

    pub fn with_frame_tracing(mut self, enabled: bool) -> Self {
        self.trace_frames = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.max_pdu_size, 65536);
        assert!(!config.trace_frames);
    }

    #[test]
    fn builder() {
        let config = SessionConfig::new()
            .with_max_pdu_size(1024)
            .with_frame_tracing(true);

        assert_eq!(config.max_pdu_size, 1024);
        assert!(config.trace_frames);
    }

    #[test]
    fn ceiling_never_below_header() {
        let config = SessionConfig::new().with_max_pdu_size(3);
        assert_eq!(config.max_pdu_size, 16);
    }
}
