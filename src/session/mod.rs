// ABOUTME: SMPP session owning one connection and one sequence allocator
// ABOUTME: Exposes connect/close, raw PDU read/write, and bound-state tracking

//! SMPP Session Module
//!
//! A [`Session`] owns a single connection to an SMSC and the sequence counter
//! used for the requests sent over it. It builds operation PDUs
//! ([`bind`](Session::bind), [`submit_sm`](Session::submit_sm), ...) and moves
//! whole PDUs across the wire with [`read`](Session::read) and
//! [`write`](Session::write). Matching responses to requests is left to the
//! caller.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use smpp_session::datatypes::{CommandId, Params};
//! use smpp_session::Session;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut session = Session::connect("localhost", 2775).await?;
//!
//! let bind = session.bind("system_id", "password", &Params::new())?;
//! session.write(&bind).await?;
//! let response = session.read().await?;
//! assert_eq!(response.command_id(), CommandId::BindTransceiverResp);
//! assert!(session.is_bound());
//!
//! let submit = session.submit_sm("1234", "5678", "Hello!", &Params::new())?;
//! session.write(&submit).await?;
//!
//! let unbind = session.unbind();
//! session.write(&unbind).await?;
//! session.close().await;
//! # Ok(())
//! # }
//! ```

mod builder;
mod config;
mod error;
mod operations;

pub use builder::SessionBuilder;
pub use config::SessionConfig;
pub use error::{SessionError, SessionResult};

use crate::codec::Pdu;
use crate::connection::Connection;
use crate::datatypes::CommandId;
use crate::sequence::SequenceAllocator;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tracing::{debug, warn};

/// One SMPP session over one transport.
///
/// The session is connected from construction until [`close`](Self::close).
/// It becomes bound when [`read`](Self::read) returns a successful bind
/// response to the last bind request sent with [`write`](Self::write), and
/// stops being bound on unbind, unbind_resp, or close.
///
/// Operation constructors take `&self` and only touch the sequence allocator,
/// so a session shared behind an `Arc` can build PDUs from several tasks.
/// `read`, `write` and `close` take `&mut self`; no PDU can be built through
/// the same session while one of them is running.
#[derive(Debug)]
pub struct Session<S = TcpStream> {
    connection: Option<Connection<S>>,
    sequence: SequenceAllocator,
    /// Sequence number of a bind request still waiting for its response
    pending_bind: Option<u32>,
    bound: bool,
}

impl Session<TcpStream> {
    /// Open a TCP connection to `host:port` with the default configuration
    pub async fn connect(host: &str, port: u16) -> SessionResult<Self> {
        Self::connect_with(host, port, SessionConfig::default()).await
    }

    /// Open a TCP connection to `host:port`.
    ///
    /// Name resolution, refusal, and OS level timeouts are all reported as
    /// [`SessionError::Connect`]; nothing is retried.
    pub async fn connect_with(host: &str, port: u16, config: SessionConfig) -> SessionResult<Self> {
        let addr = format!("{host}:{port}");
        debug!(%addr, "connecting");

        let socket = TcpStream::connect((host, port))
            .await
            .map_err(|source| SessionError::Connect {
                addr: addr.clone(),
                source,
            })?;

        debug!(%addr, "connected");
        Ok(Self::from_stream(socket, config))
    }
}

impl<S> Session<S> {
    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    pub fn is_bound(&self) -> bool {
        self.bound
    }

    /// Allocate the next sequence number for an outbound request
    pub fn next_sequence(&self) -> u32 {
        self.sequence.next()
    }

    /// The most recently allocated sequence number
    pub fn current_sequence(&self) -> u32 {
        self.sequence.current()
    }
}

impl<S: AsyncRead + AsyncWrite + Unpin> Session<S> {
    /// Wrap an already established stream.
    ///
    /// This is the hook for transports other than a plain `TcpStream`, for
    /// example a stream wrapped with read/write deadlines.
    pub fn from_stream(stream: S, config: SessionConfig) -> Self {
        Session {
            connection: Some(Connection::with_config(stream, &config)),
            sequence: SequenceAllocator::new(),
            pending_bind: None,
            bound: false,
        }
    }

    /// Read the next PDU from the SMSC.
    ///
    /// On error the bound state is unchanged; see [`SessionError::is_fatal`]
    /// for whether the connection can still be used.
    ///
    /// A stream that ends before the first byte of a frame is reported as
    /// [`SessionError::ConnectionClosed`] rather than
    /// [`SessionError::ShortRead`], so an orderly hang-up by the SMSC can be
    /// told apart from a truncated frame. Both are fatal.
    pub async fn read(&mut self) -> SessionResult<Pdu> {
        let connection = self.connection.as_mut().ok_or(SessionError::NotConnected)?;
        let pdu = connection.read_pdu().await?;
        self.observe(&pdu);
        Ok(pdu)
    }

    /// Write one PDU to the SMSC
    pub async fn write(&mut self, pdu: &Pdu) -> SessionResult<()> {
        let connection = self.connection.as_mut().ok_or(SessionError::NotConnected)?;
        connection.write_pdu(pdu).await?;

        if pdu.command_id().is_bind() {
            self.pending_bind = Some(pdu.sequence_number());
        }
        Ok(())
    }

    /// Release the transport.
    ///
    /// Safe to call more than once. Any later read or write fails with
    /// [`SessionError::NotConnected`]. Output left unsent by an abandoned
    /// write is discarded, not flushed, so close returns even when the peer
    /// has stopped reading. A shutdown failure is only logged since the
    /// socket is dropped either way.
    pub async fn close(&mut self) {
        if let Some(connection) = self.connection.take() {
            if let Err(e) = connection.shutdown().await {
                debug!(error = %e, "error shutting down connection");
            }
            debug!("connection closed");
        }

        self.pending_bind = None;
        self.bound = false;
    }

    /// Track bind state from PDUs received by the session
    fn observe(&mut self, pdu: &Pdu) {
        let sequence_number = pdu.sequence_number();
        let answers_bind = self.pending_bind == Some(sequence_number);

        match pdu.command_id() {
            id if id.is_bind_response() && answers_bind => {
                self.pending_bind = None;
                self.bound = pdu.command_status().is_ok();
                if self.bound {
                    debug!(sequence_number, "session bound");
                } else {
                    warn!(sequence_number, status = ?pdu.command_status(), "bind rejected");
                }
            }
            CommandId::GenericNack if answers_bind => {
                self.pending_bind = None;
                warn!(sequence_number, status = ?pdu.command_status(), "bind rejected with generic_nack");
            }
            id if id.is_bind_response() => {
                debug!(sequence_number, "ignoring bind response for unknown request");
            }
            CommandId::Unbind | CommandId::UnbindResp => {
                if self.bound {
                    debug!(sequence_number, "session unbound");
                }
                self.bound = false;
            }
            _ => {}
        }
    }
}
