// ABOUTME: Provides length-prefixed SMPP frame I/O over a single buffered byte stream
// ABOUTME: Enforces the inbound size ceiling and reports short reads and writes as errors

use crate::codec::{Encodable, LENGTH_PREFIX_SIZE, MIN_FRAME_SIZE, Pdu};
use crate::session::{SessionConfig, SessionError, SessionResult};
use crate::wire::{self, Direction};
use bytes::{Buf, BytesMut};
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufWriter};
use tokio::net::TcpStream;

/// SMPP frame transport
///
/// Every frame on the wire is a 4 byte big-endian `command_length` (which
/// counts itself) followed by the 12 byte header and the body. `Connection`
/// owns the stream and turns it into a sequence of whole frames in both
/// directions; what a frame means is left to the session.
///
/// ## Concurrency
///
/// A connection serves one reader and one writer at a time: both directions
/// take `&mut self`. `read_pdu` is cancel safe. If its future is dropped,
/// every byte already received stays in the read buffer and the next call
/// resumes from there. `write_pdu` is not: dropping it mid-frame may leave a
/// partial frame on the wire, after which the connection must be closed.
#[derive(Debug)]
pub struct Connection<S = TcpStream> {
    // The stream is decorated with a `BufWriter` so a frame goes out in as
    // few syscalls as possible. Reads pass straight through to the stream.
    stream: BufWriter<S>,

    // Bytes received but not yet handed out as a frame.
    buffer: BytesMut,

    max_pdu_size: u32,
    trace_frames: bool,
}

impl<S: AsyncRead + AsyncWrite + Unpin> Connection<S> {
    /// Create a new `Connection` with the default configuration
    pub fn new(socket: S) -> Connection<S> {
        Self::with_config(socket, &SessionConfig::default())
    }

    pub fn with_config(socket: S, config: &SessionConfig) -> Connection<S> {
        Connection {
            stream: BufWriter::new(socket),
            buffer: BytesMut::with_capacity(4 * 1024),
            max_pdu_size: config.max_pdu_size,
            trace_frames: config.trace_frames,
        }
    }

    /// Read a single PDU from the underlying stream.
    ///
    /// Waits until a whole frame has been received. Bytes past the end of
    /// the frame are kept for the next call.
    ///
    /// # Errors
    ///
    /// - [`SessionError::OversizedPdu`] as soon as a length prefix above the
    ///   ceiling is seen; the body is never awaited
    /// - [`SessionError::ShortRead`] if the stream ends inside a frame
    /// - [`SessionError::ConnectionClosed`] if it ends between frames, before
    ///   any byte of the next length prefix. This is a distinct error rather
    ///   than a zero-byte [`SessionError::ShortRead`] so callers can tell a
    ///   peer hang-up from a truncated frame; it is just as fatal.
    /// - [`SessionError::MalformedPdu`] if the codec rejects a whole frame
    pub async fn read_pdu(&mut self) -> SessionResult<Pdu> {
        loop {
            if let Some(pdu) = self.parse_frame()? {
                return Ok(pdu);
            }

            // `0` indicates "end of stream".
            if 0 == self.stream.read_buf(&mut self.buffer).await? {
                if self.buffer.is_empty() {
                    return Err(SessionError::ConnectionClosed);
                }

                let expected = match self.peek_length() {
                    Some(length) => length as usize,
                    None => LENGTH_PREFIX_SIZE,
                };
                return Err(SessionError::ShortRead {
                    expected,
                    received: self.buffer.len(),
                });
            }
        }
    }

    /// The command_length of the frame at the front of the buffer, if its
    /// prefix has arrived
    fn peek_length(&self) -> Option<u32> {
        if self.buffer.len() < LENGTH_PREFIX_SIZE {
            return None;
        }
        let mut prefix = &self.buffer[..LENGTH_PREFIX_SIZE];
        Some(prefix.get_u32())
    }

    /// Tries to split one frame off the read buffer and parse it. Returns
    /// `Ok(None)` when more bytes are needed.
    fn parse_frame(&mut self) -> SessionResult<Option<Pdu>> {
        let Some(length) = self.peek_length() else {
            return Ok(None);
        };

        // Checked on the prefix alone so a hostile length never makes us
        // buffer its body.
        if length > self.max_pdu_size {
            tracing::warn!(length, max = self.max_pdu_size, "rejecting oversized PDU");
            return Err(SessionError::OversizedPdu {
                length,
                max: self.max_pdu_size,
            });
        }

        if (length as usize) < MIN_FRAME_SIZE {
            tracing::warn!(length, "rejecting PDU shorter than its header");
            return Err(SessionError::InvalidFrameLength {
                length,
                min: MIN_FRAME_SIZE as u32,
            });
        }

        let length = length as usize;
        if self.buffer.len() < length {
            self.buffer.reserve(length - self.buffer.len());
            return Ok(None);
        }

        let frame = self.buffer.split_to(length).freeze();

        if self.trace_frames {
            wire::trace_frame(Direction::Inbound, &frame);
        }

        match Pdu::parse(&frame) {
            Ok(pdu) => Ok(Some(pdu)),
            Err(e) => {
                tracing::warn!(error = %e, "dropping malformed PDU");
                Err(SessionError::MalformedPdu(e))
            }
        }
    }

    /// Write a single PDU to the underlying stream.
    ///
    /// The frame is written to the buffered stream and flushed in one go.
    /// If the stream stops accepting bytes mid-frame the error is
    /// [`SessionError::ShortWrite`]; SMPP framing cannot be resumed, so the
    /// connection is unusable afterwards.
    pub async fn write_pdu(&mut self, pdu: &Pdu) -> SessionResult<()> {
        let frame = pdu.to_bytes();

        if self.trace_frames {
            wire::trace_frame(Direction::Outbound, &frame);
        }

        let frame_length = frame.len();
        let short_write = |e: io::Error| match e.kind() {
            io::ErrorKind::WriteZero => SessionError::ShortWrite {
                frame_length,
                source: e,
            },
            _ => SessionError::Transport(e),
        };

        self.stream.write_all(&frame).await.map_err(short_write)?;

        // Ensure the encoded frame is written to the socket.
        self.stream.flush().await.map_err(short_write)
    }

    /// Shut down the write half of the stream and release it.
    ///
    /// Output still sitting in the write buffer (the tail of a frame whose
    /// write was abandoned) is discarded rather than flushed, so this never
    /// waits on a peer that has stopped reading.
    pub async fn shutdown(self) -> io::Result<()> {
        let discarded = self.stream.buffer().len();
        if discarded > 0 {
            tracing::debug!(discarded, "discarding unsent output");
        }

        let mut stream = self.stream.into_inner();
        stream.shutdown().await
    }

    /// Number of received bytes not yet returned as a frame
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datatypes::{CommandId, CommandStatus, Field};
    use std::time::Duration;
    use tokio::io::{AsyncWriteExt, DuplexStream, duplex};

    fn pair(config: SessionConfig) -> (Connection<DuplexStream>, DuplexStream) {
        let (local, remote) = duplex(8 * 1024);
        (Connection::with_config(local, &config), remote)
    }

    fn frame_with_length(length: u32, body_len: usize) -> Vec<u8> {
        let mut frame = length.to_be_bytes().to_vec();
        frame.extend_from_slice(&u32::from(CommandId::EnquireLink).to_be_bytes());
        frame.extend_from_slice(&0u32.to_be_bytes());
        frame.extend_from_slice(&1u32.to_be_bytes());
        frame.resize(MIN_FRAME_SIZE + body_len, 0xAA);
        frame
    }

    #[tokio::test]
    async fn reads_frame_delivered_in_pieces() {
        let (mut connection, mut remote) = pair(SessionConfig::default());
        let pdu = Pdu::new(CommandId::EnquireLink, 5, CommandStatus::Ok);
        let bytes = pdu.to_bytes();

        let writer = tokio::spawn(async move {
            for chunk in bytes.chunks(3) {
                remote.write_all(chunk).await.unwrap();
                remote.flush().await.unwrap();
                tokio::task::yield_now().await;
            }
            remote
        });

        let read = connection.read_pdu().await.unwrap();
        assert_eq!(read, pdu);
        drop(writer.await.unwrap());
    }

    #[tokio::test]
    async fn keeps_bytes_of_following_frame() {
        let (mut connection, mut remote) = pair(SessionConfig::default());
        let first = Pdu::new(CommandId::EnquireLink, 1, CommandStatus::Ok);
        let second = Pdu::new(CommandId::Unbind, 2, CommandStatus::Ok);

        let mut both = first.to_bytes().to_vec();
        both.extend_from_slice(&second.to_bytes());
        remote.write_all(&both).await.unwrap();

        assert_eq!(connection.read_pdu().await.unwrap(), first);
        assert_eq!(connection.read_pdu().await.unwrap(), second);
        assert_eq!(connection.buffered(), 0);
    }

    #[tokio::test]
    async fn frame_at_ceiling_is_accepted() {
        let (mut connection, mut remote) = pair(SessionConfig::new().with_max_pdu_size(64));

        remote.write_all(&frame_with_length(64, 48)).await.unwrap();

        let pdu = connection.read_pdu().await.unwrap();
        assert_eq!(pdu.command_id(), CommandId::EnquireLink);
        assert_eq!(pdu.optional_parameters().len(), 48);
    }

    #[tokio::test]
    async fn frame_over_ceiling_rejected_before_body() {
        let (mut connection, mut remote) = pair(SessionConfig::new().with_max_pdu_size(64));

        // Only the prefix is sent; waiting for the body would hang.
        remote.write_all(&65u32.to_be_bytes()).await.unwrap();

        let result = tokio::time::timeout(Duration::from_secs(1), connection.read_pdu())
            .await
            .expect("oversized frame must be rejected without awaiting its body");

        assert!(matches!(
            result,
            Err(SessionError::OversizedPdu { length: 65, max: 64 })
        ));
    }

    #[tokio::test]
    async fn prefix_then_eof_is_short_read() {
        let (mut connection, mut remote) = pair(SessionConfig::default());

        remote.write_all(&16u32.to_be_bytes()).await.unwrap();
        drop(remote);

        let result = connection.read_pdu().await;
        assert!(matches!(
            result,
            Err(SessionError::ShortRead {
                expected: 16,
                received: 4
            })
        ));
    }

    #[tokio::test]
    async fn partial_prefix_then_eof_is_short_read() {
        let (mut connection, mut remote) = pair(SessionConfig::default());

        remote.write_all(&[0x00, 0x00]).await.unwrap();
        drop(remote);

        let result = connection.read_pdu().await;
        assert!(matches!(
            result,
            Err(SessionError::ShortRead {
                expected: 4,
                received: 2
            })
        ));
    }

    #[tokio::test]
    async fn eof_between_frames_is_clean_close() {
        let (mut connection, remote) = pair(SessionConfig::default());
        drop(remote);

        let result = connection.read_pdu().await;
        assert!(matches!(result, Err(SessionError::ConnectionClosed)));
    }

    #[tokio::test]
    async fn length_below_header_rejected() {
        let (mut connection, mut remote) = pair(SessionConfig::default());

        remote.write_all(&8u32.to_be_bytes()).await.unwrap();

        let result = connection.read_pdu().await;
        assert!(matches!(
            result,
            Err(SessionError::InvalidFrameLength { length: 8, min: 16 })
        ));
    }

    #[tokio::test]
    async fn malformed_frame_is_consumed() {
        let (mut connection, mut remote) = pair(SessionConfig::default());

        let mut bad = frame_with_length(16, 0);
        bad[4..8].copy_from_slice(&0x0000_000Au32.to_be_bytes());
        remote.write_all(&bad).await.unwrap();
        let good = Pdu::new(CommandId::EnquireLinkResp, 9, CommandStatus::Ok);
        remote.write_all(&good.to_bytes()).await.unwrap();

        let err = connection.read_pdu().await.unwrap_err();
        assert!(matches!(err, SessionError::MalformedPdu(_)));
        assert!(!err.is_fatal());

        assert_eq!(connection.read_pdu().await.unwrap(), good);
    }

    #[tokio::test]
    async fn write_produces_exact_frame() {
        let (mut connection, mut remote) = pair(SessionConfig::new().with_frame_tracing(true));

        let mut pdu = Pdu::new(CommandId::SubmitSm, 2, CommandStatus::Ok);
        pdu.set_field(Field::ShortMessage, "hi").unwrap();
        connection.write_pdu(&pdu).await.unwrap();

        let expected = pdu.to_bytes();
        let mut received = vec![0u8; expected.len()];
        remote.read_exact(&mut received).await.unwrap();
        assert_eq!(received, expected.as_ref());
    }

    #[tokio::test]
    async fn write_to_closed_peer_fails() {
        let (mut connection, remote) = pair(SessionConfig::default());
        drop(remote);

        let pdu = Pdu::new(CommandId::EnquireLink, 1, CommandStatus::Ok);
        let result = connection.write_pdu(&pdu).await;

        assert!(result.is_err());
        assert!(result.unwrap_err().is_fatal());
    }
}
