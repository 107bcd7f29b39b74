mod command_id;
mod command_status;
mod field;
mod interface_version;
mod params;

pub use command_id::CommandId;
pub use command_status::CommandStatus;
pub use field::{Field, FieldValue};
pub use interface_version::InterfaceVersion;
pub use params::Params;
