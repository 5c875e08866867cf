//! Async Modbus RTU client engine: frame encoding/decoding, CRC-16,
//! stream reassembly, the Enron vendor register-width extension, and a
//! single-transaction-at-a-time engine built on a pluggable [`Transport`].
//!
//! [`Transport`]: transport::Transport

pub mod config;
pub mod device_id;
pub mod enron;
pub mod error;
pub mod facade;
pub mod logging;
pub mod protocol;
pub mod rtu;
pub mod transaction;
pub mod transport;

pub use enron::{EnronConfig, EnronConfigError, RegisterRange};
pub use error::{ClientError, EngineError, ExceptionCode, TransactionError};
pub use facade::BlockingClient;
pub use protocol::{
    DebugInfo, EncodeError, ExpectedLength, FileRecordPayload, FunctionCode, RegisterValue,
    RegisterValues, RegisterWriteValues, Request, Response, ResponseKind,
};
pub use transaction::{Engine, EngineConfig};
pub use transport::{Framing, Transport};
