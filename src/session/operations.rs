// ABOUTME: Operation constructors that stamp command ids and sequence numbers onto PDUs
// ABOUTME: Requests take a fresh sequence number; responses echo the peer's

use super::{Session, SessionError, SessionResult};
use crate::codec::Pdu;
use crate::datatypes::{CommandId, CommandStatus, Field, FieldValue, InterfaceVersion, Params};

impl<S> Session<S> {
    /// Build a bind_transceiver request advertising SMPP 3.4.
    ///
    /// `params` are applied after the required fields, in insertion order,
    /// and may override them. If any field is rejected the whole call fails
    /// and no sequence number is used up.
    pub fn bind(&self, system_id: &str, password: &str, params: &Params) -> SessionResult<Pdu> {
        let mut pdu = Pdu::new(CommandId::BindTransceiver, 0, CommandStatus::Ok);

        set(&mut pdu, Field::InterfaceVersion, u8::from(InterfaceVersion::SmppV34))?;
        set(&mut pdu, Field::SystemId, system_id)?;
        set(&mut pdu, Field::Password, password)?;

        self.finish_request(pdu, params)
    }

    /// Build a submit_sm request.
    ///
    /// `short_message` may be text or raw octets (already encoded for the
    /// data_coding given in `params`). Extra fields follow the same rules as
    /// [`bind`](Self::bind).
    pub fn submit_sm(
        &self,
        source_addr: &str,
        destination_addr: &str,
        short_message: impl Into<FieldValue>,
        params: &Params,
    ) -> SessionResult<Pdu> {
        let mut pdu = Pdu::new(CommandId::SubmitSm, 0, CommandStatus::Ok);

        set(&mut pdu, Field::SourceAddr, source_addr)?;
        set(&mut pdu, Field::DestinationAddr, destination_addr)?;
        set(&mut pdu, Field::ShortMessage, short_message)?;

        self.finish_request(pdu, params)
    }

    pub fn enquire_link(&self) -> Pdu {
        Pdu::new(CommandId::EnquireLink, self.next_sequence(), CommandStatus::Ok)
    }

    pub fn unbind(&self) -> Pdu {
        Pdu::new(CommandId::Unbind, self.next_sequence(), CommandStatus::Ok)
    }

    /// Answer an enquire_link from the SMSC, echoing its sequence number
    pub fn enquire_link_resp(&self, sequence_number: u32) -> Pdu {
        Pdu::new(CommandId::EnquireLinkResp, sequence_number, CommandStatus::Ok)
    }

    /// Answer an unbind from the SMSC, echoing its sequence number
    pub fn unbind_resp(&self, sequence_number: u32) -> Pdu {
        Pdu::new(CommandId::UnbindResp, sequence_number, CommandStatus::Ok)
    }

    /// Acknowledge a deliver_sm, echoing its sequence number.
    /// message_id is unused in deliver_sm_resp and left empty.
    pub fn deliver_sm_resp(&self, sequence_number: u32) -> Pdu {
        Pdu::new(CommandId::DeliverSmResp, sequence_number, CommandStatus::Ok)
    }

    /// Reject a PDU that could not be handled, typically with the status from
    /// [`CodecError::to_command_status`](crate::codec::CodecError::to_command_status)
    pub fn generic_nack(&self, sequence_number: u32, status: CommandStatus) -> Pdu {
        Pdu::new(CommandId::GenericNack, sequence_number, status)
    }

    /// Apply caller fields, then take a sequence number only once the PDU is
    /// known to be valid
    fn finish_request(&self, mut pdu: Pdu, params: &Params) -> SessionResult<Pdu> {
        for (field, value) in params.iter() {
            set(&mut pdu, field, value.clone())?;
        }

        pdu.set_sequence_number(self.next_sequence());
        Ok(pdu)
    }
}

fn set(pdu: &mut Pdu, field: Field, value: impl Into<FieldValue>) -> SessionResult<()> {
    pdu.set_field(field, value).map_err(SessionError::InvalidField)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{CodecError, Encodable};
    use tokio::io::{DuplexStream, duplex};

    fn session() -> Session<DuplexStream> {
        let (local, _remote) = duplex(64);
        Session::from_stream(local, Default::default())
    }

    #[test]
    fn bind_on_fresh_session() {
        let session = session();

        let pdu = session.bind("test", "pwd", &Params::new()).unwrap();

        assert_eq!(pdu.command_id(), CommandId::BindTransceiver);
        assert_eq!(pdu.command_status(), CommandStatus::Ok);
        assert_eq!(pdu.sequence_number(), 1);
        assert_eq!(pdu.field(Field::InterfaceVersion), Some(&FieldValue::Integer(0x34)));
        assert_eq!(pdu.field(Field::SystemId), Some(&FieldValue::from("test")));
        assert_eq!(pdu.field(Field::Password), Some(&FieldValue::from("pwd")));
    }

    #[test]
    fn bind_applies_extra_params() {
        let session = session();
        let params = Params::new()
            .with(Field::SystemType, "VMA")
            .with(Field::AddrTon, 1u8)
            .with(Field::AddressRange, "^44");

        let pdu = session.bind("test", "pwd", &params).unwrap();

        assert_eq!(pdu.field(Field::SystemType), Some(&FieldValue::from("VMA")));
        assert_eq!(pdu.field(Field::AddrTon), Some(&FieldValue::Integer(1)));
        assert_eq!(pdu.field(Field::AddressRange), Some(&FieldValue::from("^44")));
    }

    #[test]
    fn extra_params_override_required_fields() {
        let session = session();
        let params = Params::new().with(Field::InterfaceVersion, 0x33u8);

        let pdu = session.bind("test", "pwd", &params).unwrap();

        assert_eq!(pdu.field(Field::InterfaceVersion), Some(&FieldValue::Integer(0x33)));
    }

    #[test]
    fn rejected_extra_param_fails_whole_bind() {
        let session = session();
        let params = Params::new()
            .with(Field::SystemType, "VMA")
            .with(Field::ShortMessage, "not a bind field");

        let err = session.bind("test", "pwd", &params).unwrap_err();

        assert!(matches!(
            err,
            SessionError::InvalidField(CodecError::UnknownField {
                field: Field::ShortMessage,
                ..
            })
        ));
        assert!(!err.is_fatal());
        // Nothing was consumed, so a corrected retry still gets 1
        assert_eq!(session.current_sequence(), 0);
        assert_eq!(session.bind("test", "pwd", &Params::new()).unwrap().sequence_number(), 1);
    }

    #[test]
    fn oversized_system_id_rejected() {
        let session = session();

        let err = session
            .bind("a-system-id-that-is-too-long", "pwd", &Params::new())
            .unwrap_err();

        assert!(matches!(
            err,
            SessionError::InvalidField(CodecError::FieldValidation {
                field: Field::SystemId,
                ..
            })
        ));
    }

    #[test]
    fn consecutive_submits_are_sequential() {
        let session = session();

        let first = session.submit_sm("1234", "5678", "one", &Params::new()).unwrap();
        let second = session.submit_sm("1234", "5678", "two", &Params::new()).unwrap();

        assert_eq!(second.sequence_number(), first.sequence_number() + 1);
        assert_eq!(first.sequence_number(), 1);
    }

    #[test]
    fn submit_sm_sets_addresses_and_message() {
        let session = session();
        let params = Params::new()
            .with(Field::DataCoding, 0x08u8)
            .with(Field::RegisteredDelivery, 1u8);

        let pdu = session
            .submit_sm("1234", "5678", vec![0x00u8, 0x48, 0x00, 0x69], &params)
            .unwrap();

        assert_eq!(pdu.command_id(), CommandId::SubmitSm);
        assert_eq!(pdu.field(Field::SourceAddr), Some(&FieldValue::from("1234")));
        assert_eq!(pdu.field(Field::DestinationAddr), Some(&FieldValue::from("5678")));
        assert_eq!(
            pdu.field(Field::ShortMessage).and_then(FieldValue::as_octets),
            Some(&[0x00, 0x48, 0x00, 0x69][..])
        );
        assert_eq!(pdu.field(Field::DataCoding), Some(&FieldValue::Integer(8)));
    }

    #[test]
    fn enquire_link_resp_echoes_sequence() {
        let session = session();
        session.enquire_link();

        let pdu = session.enquire_link_resp(42);

        assert_eq!(pdu.command_id(), CommandId::EnquireLinkResp);
        assert_eq!(pdu.command_status(), CommandStatus::Ok);
        assert_eq!(pdu.sequence_number(), 42);
        // Responses never draw from the allocator
        assert_eq!(session.current_sequence(), 1);
    }

    #[test]
    fn responses_echo_sequence() {
        let session = session();

        assert_eq!(session.unbind_resp(7).command_id(), CommandId::UnbindResp);
        assert_eq!(session.unbind_resp(7).sequence_number(), 7);
        assert_eq!(session.deliver_sm_resp(8).sequence_number(), 8);

        let nack = session.generic_nack(9, CommandStatus::InvalidCommandId);
        assert_eq!(nack.command_status(), CommandStatus::InvalidCommandId);
        assert_eq!(nack.sequence_number(), 9);
        assert_eq!(session.current_sequence(), 0);
    }

    #[test]
    fn constructed_pdus_survive_round_trip() {
        let session = session();
        let params = Params::new().with(Field::ValidityPeriod, "000001000000000R");

        let pdus = vec![
            session.bind("test", "pwd", &Params::new()).unwrap(),
            session.submit_sm("1234", "5678", "Hello", &params).unwrap(),
            session.enquire_link(),
            session.enquire_link_resp(42),
            session.unbind(),
        ];

        for pdu in pdus {
            let parsed = Pdu::parse(&pdu.to_bytes()).unwrap();
            assert_eq!(parsed.header(), pdu.header());
            assert!(parsed.fields().eq(pdu.fields()));
        }
    }
}
