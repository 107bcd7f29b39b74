// ABOUTME: Builder that collects session options before connecting or wrapping a stream
// ABOUTME: Thin front over SessionConfig for callers that prefer chained setup

use super::{Session, SessionConfig, SessionResult};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;

/// Builder for a [`Session`] with non-default options
///
/// # Example
///
/// ```rust,no_run
/// use smpp_session::SessionBuilder;
///
/// # async fn example() -> smpp_session::Result<()> {
/// let session = SessionBuilder::new()
///     .max_pdu_size(16 * 1024)
///     .trace_frames(true)
///     .connect("localhost", 2775)
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct SessionBuilder {
    config: SessionConfig,
}

impl SessionBuilder {
    /// Create a builder with default options
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace every option with those of `config`
    pub fn config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    /// See [`SessionConfig::with_max_pdu_size`]
    pub fn max_pdu_size(mut self, max_pdu_size: u32) -> Self {
        self.config = self.config.with_max_pdu_size(max_pdu_size);
        self
    }

    pub fn trace_frames(mut self, enabled: bool) -> Self {
        self.config = self.config.with_frame_tracing(enabled);
        self
    }

    /// The options collected so far
    pub fn session_config(&self) -> &SessionConfig {
        &self.config
    }

    /// Open a TCP connection to `host:port` with these options
    pub async fn connect(self, host: &str, port: u16) -> SessionResult<Session<TcpStream>> {
        Session::connect_with(host, port, self.config).await
    }

    /// Wrap an already established stream with these options
    pub fn build<S: AsyncRead + AsyncWrite + Unpin>(self, stream: S) -> Session<S> {
        Session::from_stream(stream, self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Encodable;
    use crate::datatypes::{CommandId, CommandStatus};
    use crate::session::SessionError;
    use crate::Pdu;
    use tokio::io::{AsyncWriteExt, duplex};
    use tokio::net::TcpListener;

    #[test]
    fn setters_update_config() {
        let builder = SessionBuilder::new().max_pdu_size(2048).trace_frames(true);

        assert_eq!(builder.session_config().max_pdu_size, 2048);
        assert!(builder.session_config().trace_frames);
    }

    #[test]
    fn config_replaces_options() {
        let builder = SessionBuilder::new()
            .trace_frames(true)
            .config(SessionConfig::new().with_max_pdu_size(512));

        assert_eq!(builder.session_config().max_pdu_size, 512);
        assert!(!builder.session_config().trace_frames);
    }

    #[tokio::test]
    async fn built_session_applies_ceiling() {
        let (local, mut remote) = duplex(1024);
        let mut session = SessionBuilder::new().max_pdu_size(64).build(local);

        remote.write_all(&65u32.to_be_bytes()).await.unwrap();

        assert!(matches!(
            session.read().await,
            Err(SessionError::OversizedPdu { length: 65, max: 64 })
        ));
    }

    #[tokio::test]
    async fn connects_over_tcp() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let smsc = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let link = Pdu::new(CommandId::EnquireLink, 3, CommandStatus::Ok);
            socket.write_all(&link.to_bytes()).await.unwrap();
            socket
        });

        let mut session = SessionBuilder::new()
            .max_pdu_size(1024)
            .connect("127.0.0.1", port)
            .await
            .unwrap();

        let pdu = session.read().await.unwrap();
        assert_eq!(pdu.command_id(), CommandId::EnquireLink);
        assert_eq!(pdu.sequence_number(), 3);

        session.close().await;
        drop(smsc.await.unwrap());
    }
}
