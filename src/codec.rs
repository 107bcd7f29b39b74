// SMPP v3.4 Codec - turns structured PDUs into wire bytes and back
//
// The session layer only relies on four capabilities from this module:
// building a headered PDU, setting named fields on it, serializing it, and
// parsing a complete frame. Mandatory body fields are described by a static
// per-command layout; optional (TLV) parameters are carried as raw bytes.

use crate::datatypes::{CommandId, CommandStatus, Field, FieldValue};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::io::Cursor;
use thiserror::Error;

/// Size of the command_length prefix that starts every frame
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Default ceiling for the command_length of inbound frames
pub const MAX_PDU_SIZE: u32 = 65536; // 64KB

/// sm_length is a single octet and 255 is reserved
pub const MAX_SHORT_MESSAGE_LEN: usize = 254;

/// SMPP v3.4 PDU Header (12 bytes following the length prefix)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PduHeader {
    pub command_id: CommandId,
    pub command_status: CommandStatus,
    pub sequence_number: u32,
}

/// Smallest legal frame: the length prefix followed by a bare header
pub const MIN_FRAME_SIZE: usize = LENGTH_PREFIX_SIZE + PduHeader::SIZE;

impl PduHeader {
    pub const SIZE: usize = 12;

    /// Decode a header positioned just after the length prefix
    pub fn decode(buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        if buf.remaining() < Self::SIZE {
            return Err(CodecError::Incomplete);
        }

        let command_id_raw = buf.get_u32();
        let command_id = CommandId::try_from(command_id_raw)
            .map_err(|_| CodecError::InvalidCommandId(command_id_raw))?;
        let command_status = CommandStatus::from(buf.get_u32());
        let sequence_number = buf.get_u32();

        Ok(PduHeader {
            command_id,
            command_status,
            sequence_number,
        })
    }

    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_u32(self.command_id.into());
        buf.put_u32(self.command_status.into());
        buf.put_u32(self.sequence_number);
    }
}

/// Trait for types that can be encoded to a complete frame
pub trait Encodable {
    /// Encode the full frame, length prefix included, to the buffer
    fn encode(&self, buf: &mut BytesMut);

    /// Size of the encoded frame, which is also its command_length
    fn encoded_size(&self) -> usize;

    /// Convert this PDU to bytes (convenience method)
    fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.encoded_size());
        self.encode(&mut buf);
        buf.freeze()
    }
}

/// Codec errors with detailed context for debugging
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("Incomplete PDU: need at least {} bytes", MIN_FRAME_SIZE)]
    Incomplete,

    #[error("command_length {declared} does not match frame size {actual}")]
    InvalidCommandLength { declared: u32, actual: usize },

    #[error("Invalid command_id: {0:#x}")]
    InvalidCommandId(u32),

    #[error("PDU body ends inside field '{field}'")]
    Truncated { field: Field },

    #[error("Field '{field}' is not part of {command_id:?}")]
    UnknownField { field: Field, command_id: CommandId },

    #[error("Field '{field}' expects a {expected} value, got {actual}")]
    FieldTypeMismatch {
        field: Field,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("Field '{field}' validation failed: {reason}")]
    FieldValidation { field: Field, reason: String },

    #[error("UTF-8 decoding error in field '{field}': {source}")]
    Utf8Error {
        field: Field,
        #[source]
        source: std::string::FromUtf8Error,
    },
}

/// Convert codec errors to appropriate SMPP command_status codes
impl CodecError {
    pub fn to_command_status(&self) -> CommandStatus {
        match self {
            CodecError::Incomplete | CodecError::InvalidCommandLength { .. } => {
                CommandStatus::InvalidCommandLength
            }
            CodecError::InvalidCommandId(_) => CommandStatus::InvalidCommandId,
            CodecError::Truncated { field } | CodecError::FieldValidation { field, .. } => {
                match field {
                    Field::SourceAddr => CommandStatus::InvalidSourceAddress,
                    Field::DestinationAddr => CommandStatus::InvalidDestinationAddress,
                    Field::ShortMessage => CommandStatus::InvalidMsgLength,
                    _ => CommandStatus::SystemError,
                }
            }
            _ => CommandStatus::SystemError,
        }
    }
}

/// Wire format of a mandatory field
#[derive(Copy, Clone, Debug)]
enum FieldFormat {
    /// C-Octet String; `max_len` counts the NUL terminator
    CString { max_len: usize },
    Integer1,
    /// sm_length octet followed by that many octets
    ShortMessage,
}

impl FieldFormat {
    fn default_value(&self) -> FieldValue {
        match self {
            FieldFormat::CString { .. } => FieldValue::Text(String::new()),
            FieldFormat::Integer1 => FieldValue::Integer(0),
            FieldFormat::ShortMessage => FieldValue::Octets(Bytes::new()),
        }
    }

    /// Check a caller value against this format, normalizing its tag
    fn validate(&self, field: Field, value: FieldValue) -> Result<FieldValue, CodecError> {
        match (self, value) {
            (FieldFormat::CString { max_len }, FieldValue::Text(s)) => {
                if s.len() >= *max_len {
                    return Err(CodecError::FieldValidation {
                        field,
                        reason: format!("{} octets exceeds maximum of {}", s.len(), max_len - 1),
                    });
                }
                if s.as_bytes().contains(&0) {
                    return Err(CodecError::FieldValidation {
                        field,
                        reason: "embedded NUL octet".to_string(),
                    });
                }
                Ok(FieldValue::Text(s))
            }
            (FieldFormat::Integer1, FieldValue::Integer(i)) => {
                if i > u8::MAX as u32 {
                    return Err(CodecError::FieldValidation {
                        field,
                        reason: format!("{i} does not fit in one octet"),
                    });
                }
                Ok(FieldValue::Integer(i))
            }
            (FieldFormat::ShortMessage, FieldValue::Text(s)) => {
                self.validate(field, FieldValue::Octets(Bytes::from(s.into_bytes())))
            }
            (FieldFormat::ShortMessage, FieldValue::Octets(b)) => {
                if b.len() > MAX_SHORT_MESSAGE_LEN {
                    return Err(CodecError::FieldValidation {
                        field,
                        reason: format!(
                            "{} octets exceeds maximum of {}",
                            b.len(),
                            MAX_SHORT_MESSAGE_LEN
                        ),
                    });
                }
                Ok(FieldValue::Octets(b))
            }
            (format, other) => Err(CodecError::FieldTypeMismatch {
                field,
                expected: match format {
                    FieldFormat::CString { .. } => "text",
                    FieldFormat::Integer1 => "integer",
                    FieldFormat::ShortMessage => "octets",
                },
                actual: other.kind(),
            }),
        }
    }

    fn decode(&self, field: Field, buf: &mut Cursor<&[u8]>) -> Result<FieldValue, CodecError> {
        match self {
            FieldFormat::CString { max_len } => {
                decode_cstring(buf, *max_len, field).map(FieldValue::Text)
            }
            FieldFormat::Integer1 => {
                if !buf.has_remaining() {
                    return Err(CodecError::Truncated { field });
                }
                Ok(FieldValue::Integer(buf.get_u8().into()))
            }
            FieldFormat::ShortMessage => {
                if !buf.has_remaining() {
                    return Err(CodecError::Truncated { field });
                }
                let sm_length = buf.get_u8() as usize;
                if buf.remaining() < sm_length {
                    return Err(CodecError::Truncated { field });
                }
                Ok(FieldValue::Octets(buf.copy_to_bytes(sm_length)))
            }
        }
    }
}

const BIND_BODY: &[(Field, FieldFormat)] = &[
    (Field::SystemId, FieldFormat::CString { max_len: 16 }),
    (Field::Password, FieldFormat::CString { max_len: 9 }),
    (Field::SystemType, FieldFormat::CString { max_len: 13 }),
    (Field::InterfaceVersion, FieldFormat::Integer1),
    (Field::AddrTon, FieldFormat::Integer1),
    (Field::AddrNpi, FieldFormat::Integer1),
    (Field::AddressRange, FieldFormat::CString { max_len: 41 }),
];

const BIND_RESP_BODY: &[(Field, FieldFormat)] =
    &[(Field::SystemId, FieldFormat::CString { max_len: 16 })];

// submit_sm and deliver_sm share the same mandatory layout
const SHORT_MESSAGE_BODY: &[(Field, FieldFormat)] = &[
    (Field::ServiceType, FieldFormat::CString { max_len: 6 }),
    (Field::SourceAddrTon, FieldFormat::Integer1),
    (Field::SourceAddrNpi, FieldFormat::Integer1),
    (Field::SourceAddr, FieldFormat::CString { max_len: 21 }),
    (Field::DestAddrTon, FieldFormat::Integer1),
    (Field::DestAddrNpi, FieldFormat::Integer1),
    (Field::DestinationAddr, FieldFormat::CString { max_len: 21 }),
    (Field::EsmClass, FieldFormat::Integer1),
    (Field::ProtocolId, FieldFormat::Integer1),
    (Field::PriorityFlag, FieldFormat::Integer1),
    (Field::ScheduleDeliveryTime, FieldFormat::CString { max_len: 17 }),
    (Field::ValidityPeriod, FieldFormat::CString { max_len: 17 }),
    (Field::RegisteredDelivery, FieldFormat::Integer1),
    (Field::ReplaceIfPresentFlag, FieldFormat::Integer1),
    (Field::DataCoding, FieldFormat::Integer1),
    (Field::SmDefaultMsgId, FieldFormat::Integer1),
    (Field::ShortMessage, FieldFormat::ShortMessage),
];

const SM_RESP_BODY: &[(Field, FieldFormat)] =
    &[(Field::MessageId, FieldFormat::CString { max_len: 65 })];

fn layout(command_id: CommandId) -> &'static [(Field, FieldFormat)] {
    match command_id {
        CommandId::BindReceiver | CommandId::BindTransmitter | CommandId::BindTransceiver => {
            BIND_BODY
        }
        CommandId::BindReceiverResp
        | CommandId::BindTransmitterResp
        | CommandId::BindTransceiverResp => BIND_RESP_BODY,
        CommandId::SubmitSm | CommandId::DeliverSm => SHORT_MESSAGE_BODY,
        CommandId::SubmitSmResp | CommandId::DeliverSmResp => SM_RESP_BODY,
        CommandId::GenericNack
        | CommandId::Unbind
        | CommandId::UnbindResp
        | CommandId::EnquireLink
        | CommandId::EnquireLinkResp => &[],
    }
}

/// A complete SMPP PDU: header, mandatory fields, and raw optional parameters.
///
/// Mandatory fields always hold a value, starting from the format's default
/// (empty string, zero, or no octets), and are serialized in wire order
/// regardless of the order they were set in.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Pdu {
    header: PduHeader,
    fields: Vec<(Field, FieldValue)>,
    optional_parameters: Bytes,
}

impl Pdu {
    /// Create a PDU with the given header and default mandatory fields
    pub fn new(command_id: CommandId, sequence_number: u32, command_status: CommandStatus) -> Self {
        Pdu {
            header: PduHeader {
                command_id,
                command_status,
                sequence_number,
            },
            fields: layout(command_id)
                .iter()
                .map(|(field, format)| (*field, format.default_value()))
                .collect(),
            optional_parameters: Bytes::new(),
        }
    }

    pub fn header(&self) -> &PduHeader {
        &self.header
    }

    pub fn command_id(&self) -> CommandId {
        self.header.command_id
    }

    pub fn command_status(&self) -> CommandStatus {
        self.header.command_status
    }

    pub fn sequence_number(&self) -> u32 {
        self.header.sequence_number
    }

    pub fn set_sequence_number(&mut self, sequence_number: u32) {
        self.header.sequence_number = sequence_number;
    }

    pub fn is_response(&self) -> bool {
        self.header.command_id.is_response()
    }

    /// Set a mandatory field.
    ///
    /// Fails without modifying the PDU if the field is not part of this
    /// command's body, the value has the wrong type, or it does not fit.
    /// Text given for short_message is stored as its UTF-8 octets.
    pub fn set_field(&mut self, field: Field, value: impl Into<FieldValue>) -> Result<(), CodecError> {
        let command_id = self.header.command_id;
        let ((_, format), (_, slot)) = layout(command_id)
            .iter()
            .zip(self.fields.iter_mut())
            .find(|((f, _), _)| *f == field)
            .ok_or(CodecError::UnknownField { field, command_id })?;

        *slot = format.validate(field, value.into())?;
        Ok(())
    }

    pub fn field(&self, field: Field) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, v)| v)
    }

    /// Mandatory fields in wire order
    pub fn fields(&self) -> impl Iterator<Item = (Field, &FieldValue)> {
        self.fields.iter().map(|(f, v)| (*f, v))
    }

    pub fn optional_parameters(&self) -> &Bytes {
        &self.optional_parameters
    }

    /// Attach already-encoded TLVs, written verbatim after the mandatory fields
    pub fn set_optional_parameters(&mut self, raw: impl Into<Bytes>) {
        self.optional_parameters = raw.into();
    }

    /// Parse one complete frame, length prefix included.
    ///
    /// Bytes after the mandatory fields are kept as optional parameters. A
    /// response whose body stops early (SMSCs omit the body on error) keeps
    /// the defaults for the missing fields.
    pub fn parse(frame: &[u8]) -> Result<Pdu, CodecError> {
        if frame.len() < MIN_FRAME_SIZE {
            return Err(CodecError::Incomplete);
        }

        let mut buf = Cursor::new(frame);
        let command_length = buf.get_u32();
        if command_length as usize != frame.len() {
            return Err(CodecError::InvalidCommandLength {
                declared: command_length,
                actual: frame.len(),
            });
        }

        let header = PduHeader::decode(&mut buf)?;

        let body_layout = layout(header.command_id);
        let mut fields = Vec::with_capacity(body_layout.len());
        for (field, field_format) in body_layout {
            let value = if !buf.has_remaining() && header.command_id.is_response() {
                field_format.default_value()
            } else {
                field_format.decode(*field, &mut buf)?
            };
            fields.push((*field, value));
        }

        let optional_parameters = buf.copy_to_bytes(buf.remaining());

        Ok(Pdu {
            header,
            fields,
            optional_parameters,
        })
    }
}

impl Encodable for Pdu {
    fn encode(&self, buf: &mut BytesMut) {
        buf.put_u32(self.encoded_size() as u32);
        self.header.encode(buf);

        for (_, value) in &self.fields {
            match value {
                FieldValue::Text(s) => encode_cstring(buf, s),
                FieldValue::Integer(i) => buf.put_u8(*i as u8),
                FieldValue::Octets(b) => {
                    buf.put_u8(b.len() as u8);
                    buf.put_slice(b);
                }
            }
        }

        buf.put_slice(&self.optional_parameters);
    }

    fn encoded_size(&self) -> usize {
        let body: usize = self
            .fields
            .iter()
            .map(|(_, value)| match value {
                FieldValue::Text(s) => s.len() + 1,
                FieldValue::Integer(_) => 1,
                FieldValue::Octets(b) => b.len() + 1,
            })
            .sum();

        MIN_FRAME_SIZE + body + self.optional_parameters.len()
    }
}

/// Decode a NUL terminated C-Octet String of at most `max_len` octets
/// (terminator included)
pub fn decode_cstring(
    buf: &mut Cursor<&[u8]>,
    max_len: usize,
    field: Field,
) -> Result<String, CodecError> {
    let window = &buf.chunk()[..buf.remaining().min(max_len)];

    let end = match window.iter().position(|&b| b == 0) {
        Some(end) => end,
        None if window.len() < max_len => return Err(CodecError::Truncated { field }),
        None => {
            return Err(CodecError::FieldValidation {
                field,
                reason: format!("no NUL terminator within {max_len} octets"),
            });
        }
    };

    let value = window[..end].to_vec();
    buf.advance(end + 1);

    String::from_utf8(value).map_err(|source| CodecError::Utf8Error { field, source })
}

/// Encode a C-Octet String followed by its NUL terminator
pub fn encode_cstring(buf: &mut BytesMut, value: &str) {
    buf.put_slice(value.as_bytes());
    buf.put_u8(0);
}
