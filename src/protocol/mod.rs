pub mod bits;
pub mod crc;
pub mod decode;
pub mod encode;
pub mod function_code;
pub mod request;
pub mod response;

pub use decode::{decode_device_id_page, decode_response, decode_response_with_width_override, DeviceIdPage};
pub(crate) use decode::validate_common;
pub use encode::{encode, EncodeError, EncodedFrame, ExpectedLength};
pub use function_code::FunctionCode;
pub use request::{RegisterValue, RegisterWriteValues, Request};
pub use response::{DebugInfo, FileRecordPayload, RegisterValues, Response, ResponseKind};
