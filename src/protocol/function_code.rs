/// A Modbus function code, as carried in byte 1 of a request/response PDU.
///
/// Unlike a raw `u8` switch, matching on this enum is exhaustively checked
/// by the compiler wherever a response is decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FunctionCode {
    ReadCoils = 0x01,
    ReadDiscreteInputs = 0x02,
    ReadHoldingRegisters = 0x03,
    ReadInputRegisters = 0x04,
    WriteSingleCoil = 0x05,
    WriteSingleRegister = 0x06,
    ReadExceptionStatus = 0x07,
    WriteMultipleCoils = 0x0F,
    WriteMultipleRegisters = 0x10,
    ReadFileRecord = 0x14,
    ReadDeviceIdentification = 0x2B,
    ReadCompressed = 0x41,
}

impl FunctionCode {
    pub fn from_u8(code: u8) -> Option<Self> {
        match code {
            0x01 => Some(Self::ReadCoils),
            0x02 => Some(Self::ReadDiscreteInputs),
            0x03 => Some(Self::ReadHoldingRegisters),
            0x04 => Some(Self::ReadInputRegisters),
            0x05 => Some(Self::WriteSingleCoil),
            0x06 => Some(Self::WriteSingleRegister),
            0x07 => Some(Self::ReadExceptionStatus),
            0x0F => Some(Self::WriteMultipleCoils),
            0x10 => Some(Self::WriteMultipleRegisters),
            0x14 => Some(Self::ReadFileRecord),
            0x2B => Some(Self::ReadDeviceIdentification),
            0x41 => Some(Self::ReadCompressed),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        self as u8
    }

    /// The response length is known ahead of time for every function code
    /// except FC43, whose reply spans a caller-unknown number of TLV
    /// objects. FC20's length is computable from the request's `recordLen`.
    pub fn has_known_response_length(self) -> bool {
        !matches!(self, Self::ReadDeviceIdentification)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::ReadCoils => "Read Coils",
            Self::ReadDiscreteInputs => "Read Discrete Inputs",
            Self::ReadHoldingRegisters => "Read Holding Registers",
            Self::ReadInputRegisters => "Read Input Registers",
            Self::WriteSingleCoil => "Write Single Coil",
            Self::WriteSingleRegister => "Write Single Register",
            Self::ReadExceptionStatus => "Read Exception Status",
            Self::WriteMultipleCoils => "Write Multiple Coils",
            Self::WriteMultipleRegisters => "Write Multiple Registers",
            Self::ReadFileRecord => "Read File Record",
            Self::ReadDeviceIdentification => "Read Device Identification",
            Self::ReadCompressed => "Read Compressed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_every_variant() {
        for fc in [
            FunctionCode::ReadCoils,
            FunctionCode::ReadDiscreteInputs,
            FunctionCode::ReadHoldingRegisters,
            FunctionCode::ReadInputRegisters,
            FunctionCode::WriteSingleCoil,
            FunctionCode::WriteSingleRegister,
            FunctionCode::ReadExceptionStatus,
            FunctionCode::WriteMultipleCoils,
            FunctionCode::WriteMultipleRegisters,
            FunctionCode::ReadFileRecord,
            FunctionCode::ReadDeviceIdentification,
            FunctionCode::ReadCompressed,
        ] {
            assert_eq!(FunctionCode::from_u8(fc.code()), Some(fc));
        }
    }
}
