// ABOUTME: Session error taxonomy covering connect, framing, codec and transport failures
// ABOUTME: Each variant carries enough context for the caller to pick a recovery strategy

use crate::codec::CodecError;
use std::io;
use thiserror::Error;

/// Errors surfaced by [`Session`](crate::Session) and its connection.
///
/// Nothing in the session retries; every failure is returned as-is with its
/// underlying cause attached.
#[derive(Debug, Error)]
pub enum SessionError {
    /// TCP dial or name resolution failed
    #[error("Failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: io::Error,
    },

    /// The peer closed the stream part way through a frame
    #[error("Short read: expected {expected} bytes, received {received}")]
    ShortRead { expected: usize, received: usize },

    /// The transport stopped accepting bytes part way through a frame
    #[error("Short write: {frame_length} byte frame was not fully written")]
    ShortWrite {
        frame_length: usize,
        #[source]
        source: io::Error,
    },

    /// Declared command_length is above the configured ceiling
    #[error("PDU length {length} exceeds maximum {max}")]
    OversizedPdu { length: u32, max: u32 },

    /// Declared command_length cannot even hold a header
    #[error("Invalid PDU length {length}, minimum is {min}")]
    InvalidFrameLength { length: u32, min: u32 },

    /// A complete frame arrived but the codec rejected it. The frame has been
    /// consumed, so the next read starts at the following frame.
    #[error("Malformed PDU: {0}")]
    MalformedPdu(#[source] CodecError),

    /// A caller supplied field was rejected while building a PDU
    #[error("Invalid field: {0}")]
    InvalidField(#[source] CodecError),

    /// Any other I/O failure on the established connection
    #[error("Transport error: {0}")]
    Transport(#[from] io::Error),

    /// The peer closed the connection cleanly between frames
    #[error("Connection closed by peer")]
    ConnectionClosed,

    /// The session was closed and its transport released
    #[error("Session is not connected")]
    NotConnected,
}

impl SessionError {
    /// Whether the connection must be torn down after this error.
    ///
    /// Only codec rejections of a single frame and local field errors leave
    /// the stream in sync.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            SessionError::MalformedPdu(_) | SessionError::InvalidField(_)
        )
    }
}

/// Result type alias for session operations
pub type SessionResult<T> = Result<T, SessionError>;
