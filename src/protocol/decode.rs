use std::collections::HashMap;

use super::crc::{crc16, verify_crc};
use super::encode::ExpectedLength;
use super::function_code::FunctionCode;
use super::request::{RegisterValue, Request};
use super::response::{FileRecordPayload, RegisterValues, ResponseKind};
use crate::enron::EnronConfig;
use crate::error::{ExceptionCode, TransactionError};

const MIN_FRAME_LEN: usize = 5;

/// Returns `frame[start..start+len]`, or `TransactionError::Length` if a
/// device-supplied byte-count field would read past the end of the frame.
/// `validate_common` only checks the frame's *total* length against what
/// the transaction expected; an internal length byte (e.g. FC3's byte
/// count, FC20's sub-request length) is independent and must be bounded
/// against `frame.len()` before it's used to slice, or a CRC-valid but
/// malformed reply panics instead of failing cleanly.
fn take(frame: &[u8], start: usize, len: usize) -> Result<&[u8], TransactionError> {
    let end = start.saturating_add(len);
    frame.get(start..end).ok_or(TransactionError::Length {
        expected: end,
        actual: frame.len(),
    })
}

/// One page of a Read Device Identification response: the decoded TLV
/// objects plus the continuation fields `device_id.rs` needs to decide
/// whether to issue a follow-up request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdPage {
    pub conformity_level: u8,
    pub more_follows: bool,
    pub next_object_id: u8,
    pub objects: HashMap<u8, String>,
}

/// Runs the validation common to every response: minimal length, CRC,
/// address match, function match (or exception), and — when the
/// transaction's expected length is known — an exact length match.
pub(crate) fn validate_common(
    frame: &[u8],
    unit_id: u8,
    function: FunctionCode,
    expected_length: ExpectedLength,
) -> Result<(), TransactionError> {
    if frame.len() < MIN_FRAME_LEN {
        return Err(TransactionError::Length {
            expected: MIN_FRAME_LEN,
            actual: frame.len(),
        });
    }
    if !verify_crc(frame) {
        let body = &frame[..frame.len() - 2];
        let calculated = crc16(body);
        let received = u16::from_le_bytes([frame[frame.len() - 2], frame[frame.len() - 1]]);
        return Err(TransactionError::Crc {
            calculated,
            received,
        });
    }

    let addr = frame[0];
    if addr != unit_id {
        return Err(TransactionError::UnexpectedAddress {
            expected: unit_id,
            actual: addr,
        });
    }

    let func_byte = frame[1];
    if func_byte == (0x80 | function.code()) {
        return Err(TransactionError::exception(ExceptionCode::from_u8(
            frame[2],
        )));
    }
    if func_byte != function.code() {
        return Err(TransactionError::UnexpectedFunction {
            expected: function.code(),
            actual: func_byte,
        });
    }

    if let ExpectedLength::Known(expected) = expected_length {
        if frame.len() != expected {
            return Err(TransactionError::Length {
                expected,
                actual: frame.len(),
            });
        }
    }

    Ok(())
}

/// Decodes a complete, CRC-valid, address/function-matched frame into a
/// typed result. `request` supplies the context (address, quantity, value
/// width) needed by decoders whose wire format alone is ambiguous.
///
/// FC43 (Read Device Identification) is never passed through this path —
/// its continuation protocol is driven by [`crate::device_id`], which uses
/// [`decode_device_id_page`] directly.
pub fn decode_response(
    frame: &[u8],
    unit_id: u8,
    function: FunctionCode,
    expected_length: ExpectedLength,
    request: &Request,
    enron: Option<&EnronConfig>,
) -> Result<ResponseKind, TransactionError> {
    validate_common(frame, unit_id, function, expected_length)?;
    decode_payload(frame, function, request, enron, None)
}

/// Like [`decode_response`], but `width_override` forces the register
/// width for FC3/4 instead of consulting `enron` — used by
/// `read_registers_enron`, which always treats the addressed registers as
/// 32-bit regardless of where they fall in the configured ranges.
pub fn decode_response_with_width_override(
    frame: &[u8],
    unit_id: u8,
    function: FunctionCode,
    expected_length: ExpectedLength,
    request: &Request,
    width_override: u8,
) -> Result<ResponseKind, TransactionError> {
    validate_common(frame, unit_id, function, expected_length)?;
    decode_payload(frame, function, request, None, Some(width_override))
}

fn decode_payload(
    frame: &[u8],
    function: FunctionCode,
    request: &Request,
    enron: Option<&EnronConfig>,
    width_override: Option<u8>,
) -> Result<ResponseKind, TransactionError> {
    match function {
        FunctionCode::ReadCoils | FunctionCode::ReadDiscreteInputs => {
            let qty = match *request {
                Request::ReadCoils { qty, .. } | Request::ReadDiscreteInputs { qty, .. } => qty,
                _ => unreachable!("request/function mismatch"),
            };
            let byte_count = frame[2] as usize;
            let bits = super::bits::unpack_coils(take(frame, 3, byte_count)?, qty as usize);
            Ok(if function == FunctionCode::ReadCoils {
                ResponseKind::ReadCoils(bits)
            } else {
                ResponseKind::ReadDiscreteInputs(bits)
            })
        }
        FunctionCode::ReadHoldingRegisters | FunctionCode::ReadInputRegisters => {
            let addr = match *request {
                Request::ReadHoldingRegisters { addr, .. }
                | Request::ReadInputRegisters { addr, .. } => addr,
                _ => unreachable!("request/function mismatch"),
            };
            let byte_count = frame[2] as usize;
            let data = take(frame, 3, byte_count)?;
            let width =
                width_override.unwrap_or_else(|| enron.map(|cfg| cfg.register_width(addr)).unwrap_or(2));
            let values = if width == 4 {
                RegisterValues::Wide(super::bits::parse_registers_u32(data))
            } else {
                RegisterValues::Narrow(super::bits::parse_registers_u16(data))
            };
            Ok(ResponseKind::ReadRegisters(values))
        }
        FunctionCode::WriteSingleCoil => {
            let addr = u16::from_be_bytes([frame[2], frame[3]]);
            let value = u16::from_be_bytes([frame[4], frame[5]]) == 0xFF00;
            Ok(ResponseKind::WriteCoil { addr, value })
        }
        FunctionCode::WriteSingleRegister => {
            let addr = u16::from_be_bytes([frame[2], frame[3]]);
            let requested_width = match request {
                Request::WriteSingleRegister {
                    value: RegisterValue::Wide(_),
                    ..
                } => 4,
                _ => 2,
            };
            let value = if requested_width == 4 {
                RegisterValue::Wide(u32::from_be_bytes([
                    frame[4], frame[5], frame[6], frame[7],
                ]))
            } else {
                RegisterValue::Narrow(u16::from_be_bytes([frame[4], frame[5]]))
            };
            Ok(ResponseKind::WriteRegister { addr, value })
        }
        FunctionCode::ReadExceptionStatus => Ok(ResponseKind::ReadExceptionStatus(frame[2])),
        FunctionCode::WriteMultipleCoils | FunctionCode::WriteMultipleRegisters => {
            let addr = u16::from_be_bytes([frame[2], frame[3]]);
            let count = u16::from_be_bytes([frame[4], frame[5]]);
            Ok(ResponseKind::WriteMultiple { addr, count })
        }
        FunctionCode::ReadFileRecord => {
            let sub_len = frame[3] as usize;
            let reference_type = frame[4];
            let payload_len = sub_len.saturating_sub(1);
            let payload_bytes = take(frame, 5, payload_len)?;
            let payload = if reference_type == 7 {
                let end = payload_bytes
                    .iter()
                    .position(|&b| b == 0)
                    .unwrap_or(payload_bytes.len());
                FileRecordPayload::Ascii(String::from_utf8_lossy(&payload_bytes[..end]).into_owned())
            } else {
                FileRecordPayload::Bytes(payload_bytes.to_vec())
            };
            Ok(ResponseKind::ReadFileRecord { payload })
        }
        FunctionCode::ReadDeviceIdentification => {
            let page = decode_device_id_page(frame)?;
            Ok(ResponseKind::ReadDeviceIdentification {
                objects: page.objects,
                conformity_level: page.conformity_level,
            })
        }
        FunctionCode::ReadCompressed => {
            let byte_count = frame[2] as usize;
            let error_flags = u16::from_be_bytes([frame[3], frame[4]]);
            // byte_count is device-supplied and independent of the frame's
            // validated total length: a CRC-valid reply can still declare
            // fewer than 2 bytes (underflowing `byte_count - 2`) or more
            // values than actually follow. Guard both rather than trust it.
            let declared_values = byte_count.saturating_sub(2) / 2;
            let available_values = frame.len().saturating_sub(5) / 2;
            let value_count = declared_values.min(available_values);
            let mut values = Vec::with_capacity(value_count);
            for i in 0..value_count {
                let offset = 5 + i * 2;
                values.push(i16::from_be_bytes([frame[offset], frame[offset + 1]]));
            }
            Ok(ResponseKind::ReadCompressed {
                values,
                error_flags,
            })
        }
    }
}

/// Decodes a single FC43 response page. Does not itself issue the
/// follow-up request when `more_follows` is set — see [`crate::device_id`].
pub fn decode_device_id_page(frame: &[u8]) -> Result<DeviceIdPage, TransactionError> {
    if frame.len() < 8 {
        return Err(TransactionError::Length {
            expected: 8,
            actual: frame.len(),
        });
    }
    let conformity_level = frame[4];
    let more_follows = frame[5] != 0x00;
    let next_object_id = frame[6];
    let num_objects = frame[7] as usize;

    let mut objects = HashMap::with_capacity(num_objects);
    let mut offset = 8;
    for _ in 0..num_objects {
        if offset + 2 > frame.len() {
            break;
        }
        let object_id = frame[offset];
        let object_len = frame[offset + 1] as usize;
        let start = offset + 2;
        let end = start + object_len;
        if end > frame.len() {
            break;
        }
        let value = String::from_utf8_lossy(&frame[start..end]).into_owned();
        objects.insert(object_id, value);
        offset = end;
    }

    Ok(DeviceIdPage {
        conformity_level,
        more_follows,
        next_object_id,
        objects,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_read_holding_registers_response() {
        let frame = [0x11, 0x03, 0x04, 0xAE, 0x41, 0x56, 0x52, 0x49, 0xAD];
        let request = Request::ReadHoldingRegisters {
            addr: 0x006B,
            qty: 2,
        };
        let result = decode_response(
            &frame,
            0x11,
            FunctionCode::ReadHoldingRegisters,
            ExpectedLength::Known(9),
            &request,
            None,
        )
        .unwrap();
        assert_eq!(
            result,
            ResponseKind::ReadRegisters(RegisterValues::Narrow(vec![0xAE41, 0x5652]))
        );
    }

    #[test]
    fn decodes_illegal_data_address_exception() {
        let frame = [0x11, 0x81, 0x02, 0xC1, 0x91];
        let request = Request::ReadCoils {
            addr: 0x0013,
            qty: 0x25,
        };
        let err = decode_response(
            &frame,
            0x11,
            FunctionCode::ReadCoils,
            ExpectedLength::Known(6),
            &request,
            None,
        )
        .unwrap_err();
        match err {
            TransactionError::Exception { code, .. } => {
                assert_eq!(code, ExceptionCode::IllegalDataAddress)
            }
            other => panic!("expected exception, got {other:?}"),
        }
    }

    #[test]
    fn device_id_page_merges_tlv_objects() {
        let mut frame = vec![0x11, 0x2B, 0x0E, 0x01, 0x01, 0xFF, 0x02, 0x02];
        frame.extend_from_slice(&[0x00, 3]);
        frame.extend_from_slice(b"Foo");
        frame.extend_from_slice(&[0x01, 3]);
        frame.extend_from_slice(b"Bar");
        let page = decode_device_id_page(&frame).unwrap();
        assert!(page.more_follows);
        assert_eq!(page.next_object_id, 0x02);
        assert_eq!(page.objects.get(&0u8).unwrap(), "Foo");
        assert_eq!(page.objects.get(&1u8).unwrap(), "Bar");
    }

    #[test]
    fn decodes_read_file_record_ascii_payload() {
        // refType=7, payload truncated at the first NUL per spec.
        let mut frame = vec![0x11, 0x14, 0x09, 0x07]; // byte_count, sub_len=7
        frame.push(7); // reference type
        frame.extend_from_slice(b"hi\0pad");
        super::super::crc::append_crc(&mut frame);
        let request = Request::ReadFileRecord {
            reference_type: 7,
            file_num: 4,
            record_num: 1,
            record_len: 3,
        };
        let result = decode_response(
            &frame,
            0x11,
            FunctionCode::ReadFileRecord,
            ExpectedLength::Known(13),
            &request,
            None,
        )
        .unwrap();
        match result {
            ResponseKind::ReadFileRecord {
                payload: FileRecordPayload::Ascii(text),
            } => assert_eq!(text, "hi"),
            other => panic!("expected ASCII payload, got {other:?}"),
        }
    }

    #[test]
    fn decodes_read_file_record_binary_payload() {
        let mut frame = vec![0x11, 0x14, 0x09, 0x07, 0x06];
        frame.extend_from_slice(&[0xDE, 0xAD, 0xBE, 0xEF, 0x00, 0x01]);
        super::super::crc::append_crc(&mut frame);
        let request = Request::ReadFileRecord {
            reference_type: 6,
            file_num: 4,
            record_num: 1,
            record_len: 3,
        };
        let result = decode_response(
            &frame,
            0x11,
            FunctionCode::ReadFileRecord,
            ExpectedLength::Known(13),
            &request,
            None,
        )
        .unwrap();
        match result {
            ResponseKind::ReadFileRecord {
                payload: FileRecordPayload::Bytes(bytes),
            } => assert_eq!(bytes, vec![0xDE, 0xAD, 0xBE, 0xEF, 0x00, 0x01]),
            other => panic!("expected binary payload, got {other:?}"),
        }
    }

    #[test]
    fn oversized_byte_count_on_holding_registers_errors_instead_of_panicking() {
        // Same total length the transaction expected (9 bytes, matches
        // ExpectedLength::Known(9)), but the device-supplied byte count at
        // frame[2] claims more data than actually follows.
        let frame = [0x11, 0x03, 0xFF, 0xAE, 0x41, 0x56, 0x52, 0x49, 0xAD];
        let request = Request::ReadHoldingRegisters {
            addr: 0x006B,
            qty: 2,
        };
        let err = decode_response(
            &frame,
            0x11,
            FunctionCode::ReadHoldingRegisters,
            ExpectedLength::Known(9),
            &request,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, TransactionError::Length { .. }));
    }

    #[test]
    fn oversized_byte_count_on_read_coils_errors_instead_of_panicking() {
        let frame = [0x11, 0x01, 0xFF, 0xC1, 0x91];
        let request = Request::ReadCoils {
            addr: 0x0013,
            qty: 0x25,
        };
        let err = decode_response(
            &frame,
            0x11,
            FunctionCode::ReadCoils,
            ExpectedLength::Known(5),
            &request,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, TransactionError::Length { .. }));
    }

    #[test]
    fn oversized_sub_request_len_on_file_record_errors_instead_of_panicking() {
        let mut frame = vec![0x11, 0x14, 0x09, 0xFF, 7];
        frame.extend_from_slice(b"hi\0pad");
        super::super::crc::append_crc(&mut frame);
        let request = Request::ReadFileRecord {
            reference_type: 7,
            file_num: 4,
            record_num: 1,
            record_len: 3,
        };
        let err = decode_response(
            &frame,
            0x11,
            FunctionCode::ReadFileRecord,
            ExpectedLength::Known(13),
            &request,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, TransactionError::Length { .. }));
    }

    #[test]
    fn read_compressed_guards_against_byte_count_underflow() {
        // byte_count = 0 would underflow `byte_count - 2` if unguarded.
        let mut frame = vec![0x11, 0x41, 0x00, 0x00, 0x00];
        super::super::crc::append_crc(&mut frame);
        let request = Request::ReadCompressed { pnu: vec![1] };
        let result = decode_response(
            &frame,
            0x11,
            FunctionCode::ReadCompressed,
            ExpectedLength::Known(frame.len()),
            &request,
            None,
        )
        .unwrap();
        match result {
            ResponseKind::ReadCompressed { values, .. } => assert!(values.is_empty()),
            other => panic!("expected ReadCompressed, got {other:?}"),
        }
    }

    #[test]
    fn read_compressed_caps_value_count_to_what_the_frame_actually_holds() {
        // byte_count claims 8 bytes (3 values) but only one value follows.
        let mut frame = vec![0x11, 0x41, 0x08, 0x00, 0x00, 0x00, 0x2A];
        super::super::crc::append_crc(&mut frame);
        let request = Request::ReadCompressed { pnu: vec![1] };
        let result = decode_response(
            &frame,
            0x11,
            FunctionCode::ReadCompressed,
            ExpectedLength::Known(frame.len()),
            &request,
            None,
        )
        .unwrap();
        match result {
            ResponseKind::ReadCompressed { values, .. } => assert_eq!(values, vec![0x2A]),
            other => panic!("expected ReadCompressed, got {other:?}"),
        }
    }
}
