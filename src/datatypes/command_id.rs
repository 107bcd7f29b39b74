use num_enum::{IntoPrimitive, TryFromPrimitive};

/// The command_id field identifies the SMPP operation carried by a PDU.
///
/// Only the operations a session client sends or must answer are listed.
/// Response ids are the request id with the high bit set.
#[derive(TryFromPrimitive, IntoPrimitive)]
#[repr(u32)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum CommandId {
    GenericNack = 0x8000_0000,
    BindReceiver = 0x0000_0001,
    BindReceiverResp = 0x8000_0001,
    BindTransmitter = 0x0000_0002,
    BindTransmitterResp = 0x8000_0002,
    SubmitSm = 0x0000_0004,
    SubmitSmResp = 0x8000_0004,
    DeliverSm = 0x0000_0005,
    DeliverSmResp = 0x8000_0005,
    Unbind = 0x0000_0006,
    UnbindResp = 0x8000_0006,
    BindTransceiver = 0x0000_0009,
    BindTransceiverResp = 0x8000_0009,
    EnquireLink = 0x0000_0015,
    EnquireLinkResp = 0x8000_0015,
}

impl CommandId {
    /// Check if this command_id represents a response PDU
    pub fn is_response(&self) -> bool {
        u32::from(*self) & 0x8000_0000 != 0
    }

    pub fn is_bind(&self) -> bool {
        matches!(
            self,
            CommandId::BindReceiver | CommandId::BindTransmitter | CommandId::BindTransceiver
        )
    }

    pub fn is_bind_response(&self) -> bool {
        matches!(
            self,
            CommandId::BindReceiverResp
                | CommandId::BindTransmitterResp
                | CommandId::BindTransceiverResp
        )
    }

    /// The response command paired with this request, if any.
    ///
    /// generic_nack answers anything, so it has no pairing of its own.
    pub fn response(&self) -> Option<CommandId> {
        if self.is_response() {
            return None;
        }
        CommandId::try_from(u32::from(*self) | 0x8000_0000).ok()
    }
}
