use thiserror::Error;

use super::bits::pack_coils;
use super::crc::append_crc;
use super::function_code::FunctionCode;
use super::request::{RegisterValue, RegisterWriteValues, Request};
use crate::enron::EnronConfig;

/// Failure building a frame, detected before the request ever reaches the
/// transport.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodeError {
    #[error("address parameter missing or malformed")]
    BadAddress,
    #[error("broadcast address not allowed for this function code")]
    BroadcastNotAllowed,
}

/// How long the matching response is expected to be, or whether one is
/// expected at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpectedLength {
    Known(usize),
    /// FC20/FC43: the device's own echoed length governs framing.
    Unknown,
    /// A broadcast write: no response is ever sent.
    Broadcast,
}

/// A fully built RTU frame (unit id, function code, PDU, CRC) plus the
/// framing contract the transaction engine and reassembler should expect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedFrame {
    pub bytes: Vec<u8>,
    pub function: FunctionCode,
    pub expected_length: ExpectedLength,
}

const MAX_COMPRESSED_PNU: usize = 16;

/// Encodes `request` addressed to `unit_id`, consulting `enron` to select
/// register width for FC3/4/6. Broadcast (`unit_id == 0`) is rejected up
/// front for every function code that requires a response.
pub fn encode(
    request: &Request,
    unit_id: u8,
    enron: Option<&EnronConfig>,
) -> Result<EncodedFrame, EncodeError> {
    if unit_id == 0 && request.requires_response() {
        return Err(EncodeError::BroadcastNotAllowed);
    }

    let (function, pdu, expected_length) = match *request {
        Request::ReadCoils { addr, qty } => {
            let data_bytes = (qty as usize).div_ceil(8);
            (
                FunctionCode::ReadCoils,
                be_pdu(addr, qty),
                ExpectedLength::Known(3 + data_bytes + 2),
            )
        }
        Request::ReadDiscreteInputs { addr, qty } => {
            let data_bytes = (qty as usize).div_ceil(8);
            (
                FunctionCode::ReadDiscreteInputs,
                be_pdu(addr, qty),
                ExpectedLength::Known(3 + data_bytes + 2),
            )
        }
        Request::ReadHoldingRegisters { addr, qty } => {
            let width = register_width(enron, addr);
            (
                FunctionCode::ReadHoldingRegisters,
                be_pdu(addr, qty),
                ExpectedLength::Known(3 + width as usize * qty as usize + 2),
            )
        }
        Request::ReadInputRegisters { addr, qty } => {
            let width = register_width(enron, addr);
            (
                FunctionCode::ReadInputRegisters,
                be_pdu(addr, qty),
                ExpectedLength::Known(3 + width as usize * qty as usize + 2),
            )
        }
        Request::WriteSingleCoil { addr, value } => {
            let coil_word: u16 = if value { 0xFF00 } else { 0x0000 };
            let len = if unit_id == 0 {
                ExpectedLength::Broadcast
            } else {
                ExpectedLength::Known(8)
            };
            (FunctionCode::WriteSingleCoil, be_pdu(addr, coil_word), len)
        }
        Request::WriteSingleRegister { addr, value } => {
            let mut pdu = addr.to_be_bytes().to_vec();
            let width = match value {
                RegisterValue::Narrow(v) => {
                    pdu.extend_from_slice(&v.to_be_bytes());
                    2
                }
                RegisterValue::Wide(v) => {
                    pdu.extend_from_slice(&v.to_be_bytes());
                    4
                }
            };
            let len = if unit_id == 0 {
                ExpectedLength::Broadcast
            } else {
                ExpectedLength::Known(6 + width)
            };
            (FunctionCode::WriteSingleRegister, pdu, len)
        }
        Request::ReadExceptionStatus => (
            FunctionCode::ReadExceptionStatus,
            Vec::new(),
            ExpectedLength::Known(5),
        ),
        Request::WriteMultipleCoils { addr, ref values } => {
            let packed = pack_coils(values);
            let mut pdu = addr.to_be_bytes().to_vec();
            pdu.extend_from_slice(&(values.len() as u16).to_be_bytes());
            pdu.push(packed.len() as u8);
            pdu.extend_from_slice(&packed);
            let len = if unit_id == 0 {
                ExpectedLength::Broadcast
            } else {
                ExpectedLength::Known(8)
            };
            (FunctionCode::WriteMultipleCoils, pdu, len)
        }
        Request::WriteMultipleRegisters { addr, ref values } => {
            let mut pdu = addr.to_be_bytes().to_vec();
            pdu.extend_from_slice(&values.quantity().to_be_bytes());
            pdu.push(values.byte_len() as u8);
            match values {
                RegisterWriteValues::Words(words) => {
                    for w in words {
                        pdu.extend_from_slice(&w.to_be_bytes());
                    }
                }
                RegisterWriteValues::Raw(bytes) => pdu.extend_from_slice(bytes),
            }
            let len = if unit_id == 0 {
                ExpectedLength::Broadcast
            } else {
                ExpectedLength::Known(8)
            };
            (FunctionCode::WriteMultipleRegisters, pdu, len)
        }
        Request::ReadFileRecord {
            reference_type,
            file_num,
            record_num,
            record_len,
        } => {
            let mut pdu = vec![0x07, reference_type];
            pdu.extend_from_slice(&file_num.to_be_bytes());
            pdu.extend_from_slice(&record_num.to_be_bytes());
            pdu.push(record_len);
            (
                FunctionCode::ReadFileRecord,
                pdu,
                ExpectedLength::Known(5 + 2 * record_len as usize + 2),
            )
        }
        Request::ReadDeviceIdentification {
            device_id_code,
            object_id,
        } => (
            FunctionCode::ReadDeviceIdentification,
            vec![0x0E, device_id_code, object_id],
            ExpectedLength::Unknown,
        ),
        Request::ReadCompressed { ref pnu } => {
            if pnu.len() > MAX_COMPRESSED_PNU {
                return Err(EncodeError::BadAddress);
            }
            let mut pdu = vec![pnu.len() as u8];
            for p in pnu {
                pdu.extend_from_slice(&p.to_be_bytes());
            }
            (
                FunctionCode::ReadCompressed,
                pdu,
                ExpectedLength::Known(4 + 2 * pnu.len() + 3),
            )
        }
    };

    let mut bytes = Vec::with_capacity(4 + pdu.len());
    bytes.push(unit_id);
    bytes.push(function.code());
    bytes.extend_from_slice(&pdu);
    append_crc(&mut bytes);

    Ok(EncodedFrame {
        bytes,
        function,
        expected_length,
    })
}

fn be_pdu(addr: u16, qty: u16) -> Vec<u8> {
    let mut pdu = Vec::with_capacity(4);
    pdu.extend_from_slice(&addr.to_be_bytes());
    pdu.extend_from_slice(&qty.to_be_bytes());
    pdu
}

fn register_width(enron: Option<&EnronConfig>, addr: u16) -> u8 {
    enron.map(|cfg| cfg.register_width(addr)).unwrap_or(2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_read_holding_registers_request() {
        let req = Request::ReadHoldingRegisters {
            addr: 0x006B,
            qty: 2,
        };
        let frame = encode(&req, 17, None).unwrap();
        assert_eq!(
            frame.bytes,
            vec![0x11, 0x03, 0x00, 0x6B, 0x00, 0x02, 0x76, 0x87]
        );
        assert_eq!(frame.expected_length, ExpectedLength::Known(9));
    }

    #[test]
    fn broadcast_write_single_coil_has_no_expected_response() {
        let req = Request::WriteSingleCoil {
            addr: 0x00AC,
            value: true,
        };
        let frame = encode(&req, 0, None).unwrap();
        assert_eq!(frame.expected_length, ExpectedLength::Broadcast);
    }

    #[test]
    fn broadcast_read_is_rejected() {
        let req = Request::ReadHoldingRegisters { addr: 0, qty: 1 };
        assert_eq!(
            encode(&req, 0, None).unwrap_err(),
            EncodeError::BroadcastNotAllowed
        );
    }

    #[test]
    fn read_compressed_rejects_too_many_pnu() {
        let req = Request::ReadCompressed {
            pnu: vec![0; MAX_COMPRESSED_PNU + 1],
        };
        assert_eq!(encode(&req, 1, None).unwrap_err(), EncodeError::BadAddress);
    }

    #[test]
    fn read_file_record_expected_length_follows_record_len() {
        let req = Request::ReadFileRecord {
            reference_type: 6,
            file_num: 4,
            record_num: 1,
            record_len: 3,
        };
        let frame = encode(&req, 1, None).unwrap();
        // 5 + 2*recordLen + 2, per spec.
        assert_eq!(frame.expected_length, ExpectedLength::Known(13));
    }
}
