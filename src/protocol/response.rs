use std::collections::HashMap;

use super::request::RegisterValue;

/// A 16- or 32-bit register sequence, as decoded under the engine's
/// `EnronConfig` (or always-narrow if none is configured).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegisterValues {
    Narrow(Vec<u16>),
    Wide(Vec<u32>),
}

/// FC20's sub-request payload: raw bytes, or ASCII text when the reference
/// type was 7 (truncated at the first NUL).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileRecordPayload {
    Bytes(Vec<u8>),
    Ascii(String),
}

/// Debug capture attached to a result when the engine is constructed with
/// `debug: true`: the original outgoing bytes and every response chunk
/// the reassembler/decoder saw along the way.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DebugInfo {
    pub request: Vec<u8>,
    pub responses: Vec<Vec<u8>>,
}

impl std::fmt::Display for DebugInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "tx={}", hex::encode(&self.request))?;
        for chunk in &self.responses {
            write!(f, " rx={}", hex::encode(chunk))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseKind {
    ReadCoils(Vec<bool>),
    ReadDiscreteInputs(Vec<bool>),
    ReadRegisters(RegisterValues),
    WriteCoil { addr: u16, value: bool },
    WriteRegister { addr: u16, value: RegisterValue },
    WriteMultiple { addr: u16, count: u16 },
    ReadFileRecord { payload: FileRecordPayload },
    ReadDeviceIdentification {
        objects: HashMap<u8, String>,
        conformity_level: u8,
    },
    ReadCompressed {
        values: Vec<i16>,
        error_flags: u16,
    },
    ReadExceptionStatus(u8),
}

/// The result of a successful transaction: a typed payload plus, in debug
/// mode, the bytes that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub kind: ResponseKind,
    pub debug: Option<DebugInfo>,
}

impl Response {
    pub fn new(kind: ResponseKind, debug: Option<DebugInfo>) -> Self {
        Self { kind, debug }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_info_formats_as_hex() {
        let info = DebugInfo {
            request: vec![0x11, 0x03],
            responses: vec![vec![0xAE, 0x41]],
        };
        assert_eq!(info.to_string(), "tx=1103 rx=ae41");
    }
}
