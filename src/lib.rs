pub mod codec;
pub mod connection;
pub mod datatypes;
pub mod sequence;
pub mod session;
pub mod wire;


// Re-export codec types for direct access
pub use codec::{CodecError, Encodable, MAX_PDU_SIZE, Pdu, PduHeader};

// Re-export the main session API for easy access
pub use session::{Session, SessionBuilder, SessionConfig, SessionError, SessionResult};

pub use sequence::SequenceAllocator;

/// Session layer of an SMPP v3.4 client.
///
/// A [`Session`] owns one connection to an SMSC, frames PDUs on the wire,
/// and hands out sequence numbers. Waiting for and correlating responses is
/// up to the caller.
///
/// # Examples
///
/// ## Sending an SMS
///
/// ```rust,no_run
/// use smpp_session::datatypes::{CommandId, Field, Params};
/// use smpp_session::Session;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let mut session = Session::connect("localhost", 2775).await?;
///
///     let bind = session.bind("system_id", "password", &Params::new())?;
///     session.write(&bind).await?;
///     session.read().await?;
///     if !session.is_bound() {
///         return Err("bind rejected".into());
///     }
///
///     let params = Params::new().with(Field::RegisteredDelivery, 1u8);
///     let submit = session.submit_sm("1234567890", "0987654321", "Hello, World!", &params)?;
///     session.write(&submit).await?;
///
///     loop {
///         let pdu = session.read().await?;
///         match pdu.command_id() {
///             CommandId::SubmitSmResp if pdu.sequence_number() == submit.sequence_number() => {
///                 println!("submit_sm_resp: {:?}", pdu.field(Field::MessageId));
///                 break;
///             }
///             CommandId::EnquireLink => {
///                 let resp = session.enquire_link_resp(pdu.sequence_number());
///                 session.write(&resp).await?;
///             }
///             _ => {}
///         }
///     }
///
///     let unbind = session.unbind();
///     session.write(&unbind).await?;
///     session.close().await;
///     Ok(())
/// }
/// ```
///
/// ## Answering a malformed frame
///
/// ```rust,no_run
/// use smpp_session::{Session, SessionError};
///
/// # async fn example(session: &mut Session) -> Result<(), SessionError> {
/// match session.read().await {
///     Ok(pdu) => println!("{pdu:?}"),
///     Err(SessionError::MalformedPdu(e)) => {
///         // The frame was dropped; the stream is still in sync
///         eprintln!("skipping frame: {e} ({:?})", e.to_command_status());
///     }
///     Err(e) => {
///         session.close().await;
///         return Err(e);
///     }
/// }
/// # Ok(())
/// # }
/// ```
pub type Result<T> = SessionResult<T>;
