use thiserror::Error;

use super::kinds::ExceptionCode;

/// Failure reported once a transaction is in flight: the request reached
/// the transport, but either nothing valid came back in time or what came
/// back didn't pass correlation/validation.
#[derive(Error, Debug)]
pub enum TransactionError {
    #[error("transaction timed out waiting for a response ({} bytes captured)", .responses.iter().map(Vec::len).sum::<usize>())]
    TimedOut {
        request: Vec<u8>,
        responses: Vec<Vec<u8>>,
    },

    #[error("CRC mismatch: calculated={calculated:04X}, received={received:04X}")]
    Crc { calculated: u16, received: u16 },

    #[error("frame length mismatch: expected={expected}, actual={actual}")]
    Length { expected: usize, actual: usize },

    #[error("unexpected unit address: expected={expected}, actual={actual}")]
    UnexpectedAddress { expected: u8, actual: u8 },

    #[error("unexpected function code: expected={expected:#04x}, actual={actual:#04x}")]
    UnexpectedFunction { expected: u8, actual: u8 },

    #[error("Modbus exception: {message} ({code})")]
    Exception {
        code: ExceptionCode,
        message: &'static str,
    },
}

impl TransactionError {
    pub fn exception(code: ExceptionCode) -> Self {
        Self::Exception {
            message: code.message(),
            code,
        }
    }
}
