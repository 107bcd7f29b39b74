// ABOUTME: Demo application that binds, submits one SMS, and unbinds over a raw session
// ABOUTME: Shows response handling and the opt-in frame dump with --debugging

use argh::FromArgs;
use smpp_session::datatypes::{CommandId, Field, Params};
use smpp_session::{Session, SessionConfig};
use std::error::Error;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Bind as transceiver, send a single SMS, and unbind
#[derive(FromArgs)]
struct CliArgs {
    /// dump every frame as hex
    #[argh(switch, short = 'd')]
    debugging: bool,

    /// the system id
    #[argh(option)]
    system_id: Option<String>,

    /// the password
    #[argh(option)]
    password: Option<String>,

    /// the hostname of IP address of the SMSC (default: localhost)
    #[argh(option)]
    host: Option<String>,

    /// the port to use when connecting to the SMSC (default: 2775)
    #[argh(option, short = 'p')]
    port: Option<u16>,

    /// the message to send
    #[argh(option, short = 'm')]
    message: String,

    /// the recipient telephone number
    #[argh(option, short = 't')]
    to: String,

    /// the telephone number that the message will be from
    #[argh(option, short = 'f')]
    from: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli_args: CliArgs = argh::from_env();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(if cli_args.debugging {
            Level::TRACE
        } else {
            Level::INFO
        })
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let host = cli_args.host.unwrap_or_else(|| "localhost".to_owned());
    let port = cli_args.port.unwrap_or(2775);
    let system_id = cli_args.system_id.unwrap_or_default();
    let password = cli_args.password.unwrap_or_default();

    let config = SessionConfig::new().with_frame_tracing(cli_args.debugging);
    let mut session = Session::connect_with(&host, port, config).await?;

    let bind = session.bind(&system_id, &password, &Params::new())?;
    session.write(&bind).await?;
    let response = session.read().await?;
    if !session.is_bound() {
        session.close().await;
        return Err(format!("bind failed: {:?}", response.command_status()).into());
    }

    println!("Connected and bound successfully");

    let params = Params::new().with(Field::RegisteredDelivery, 1u8);
    let submit = session.submit_sm(&cli_args.from, &cli_args.to, cli_args.message.as_str(), &params)?;
    session.write(&submit).await?;

    // The SMSC may interleave its own requests with our response
    let result = loop {
        let pdu = session.read().await?;
        match pdu.command_id() {
            CommandId::SubmitSmResp if pdu.sequence_number() == submit.sequence_number() => {
                break if pdu.command_status().is_ok() {
                    Ok(pdu.field(Field::MessageId).cloned())
                } else {
                    Err(pdu.command_status())
                };
            }
            CommandId::EnquireLink => {
                let resp = session.enquire_link_resp(pdu.sequence_number());
                session.write(&resp).await?;
            }
            CommandId::DeliverSm => {
                let resp = session.deliver_sm_resp(pdu.sequence_number());
                session.write(&resp).await?;
            }
            other => tracing::debug!(?other, "ignoring PDU"),
        }
    };

    match &result {
        Ok(message_id) => println!("Message sent successfully! Message ID: {message_id:?}"),
        Err(status) => eprintln!("Failed to send message: {status:?}"),
    }

    // Still attempt to unbind cleanly
    let unbind = session.unbind();
    if let Err(e) = session.write(&unbind).await {
        eprintln!("Warning: Unbind failed: {e}");
    } else if let Err(e) = session.read().await {
        eprintln!("Warning: no unbind_resp: {e}");
    }
    session.close().await;

    result
        .map(|_| ())
        .map_err(|status| format!("submit_sm rejected: {status:?}").into())
}
