/// A 16-bit register value, narrow (standard) or wide (Enron, outside the
/// configured short range).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterValue {
    Narrow(u16),
    Wide(u32),
}

/// The payload for a multiple-register write: either a sequence of words
/// or a prebuilt raw byte buffer emitted verbatim (quantity = bytes / 2).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegisterWriteValues {
    Words(Vec<u16>),
    Raw(Vec<u8>),
}

impl RegisterWriteValues {
    pub fn byte_len(&self) -> usize {
        match self {
            Self::Words(words) => words.len() * 2,
            Self::Raw(bytes) => bytes.len(),
        }
    }

    pub fn quantity(&self) -> u16 {
        (self.byte_len() / 2) as u16
    }
}

/// A tagged request, one variant per function code this engine supports.
/// Matching is exhaustive, so adding a function code means the compiler
/// finds every encoder/decoder pair that needs updating.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    ReadCoils { addr: u16, qty: u16 },
    ReadDiscreteInputs { addr: u16, qty: u16 },
    ReadHoldingRegisters { addr: u16, qty: u16 },
    ReadInputRegisters { addr: u16, qty: u16 },
    WriteSingleCoil { addr: u16, value: bool },
    WriteSingleRegister { addr: u16, value: RegisterValue },
    ReadExceptionStatus,
    WriteMultipleCoils { addr: u16, values: Vec<bool> },
    WriteMultipleRegisters { addr: u16, values: RegisterWriteValues },
    ReadFileRecord {
        reference_type: u8,
        file_num: u16,
        record_num: u16,
        record_len: u8,
    },
    ReadDeviceIdentification { device_id_code: u8, object_id: u8 },
    /// pnu must contain at most 16 entries.
    ReadCompressed { pnu: Vec<u16> },
}

impl Request {
    /// The data address this request concerns, when it carries one. Used
    /// to validate broadcast rules (unit id 0) against function codes that
    /// never return a response.
    pub fn requires_response(&self) -> bool {
        !matches!(
            self,
            Request::WriteSingleCoil { .. }
                | Request::WriteSingleRegister { .. }
                | Request::WriteMultipleCoils { .. }
                | Request::WriteMultipleRegisters { .. }
        )
    }
}
