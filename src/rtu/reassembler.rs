use crate::protocol::{ExpectedLength, FunctionCode};

/// A Modbus RTU frame never exceeds this; once the buffer grows past it
/// the oldest bytes are dropped.
const MAX_BUFFER: usize = 256;
const MIN_EXCEPTION_FRAME_LEN: usize = 5;
const DEVICE_ID_HEADER_LEN: usize = 8;

/// Locates complete Modbus answers inside a free-flowing byte stream with
/// no inherent framing. One instance per engine; re-armed for every
/// outgoing request with the unit/function/expected-length it should now
/// be looking for.
pub struct Reassembler {
    buffer: Vec<u8>,
    unit_id: u8,
    function: FunctionCode,
    expected_length: ExpectedLength,
}

impl Default for Reassembler {
    fn default() -> Self {
        Self {
            buffer: Vec::with_capacity(MAX_BUFFER),
            unit_id: 0,
            function: FunctionCode::ReadHoldingRegisters,
            expected_length: ExpectedLength::Unknown,
        }
    }
}

impl Reassembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshots the outbound unit id, function code and expected response
    /// length for the transaction about to be submitted. Must be called
    /// before the request bytes are handed to the transport.
    pub fn arm(&mut self, unit_id: u8, function: FunctionCode, expected_length: ExpectedLength) {
        self.unit_id = unit_id;
        self.function = function;
        self.expected_length = expected_length;
    }

    /// Appends an inbound chunk and scans for a candidate complete frame.
    /// Returns the frame (already removed, along with any leading
    /// garbage, from the internal buffer) or `None` if more data is
    /// needed.
    pub fn ingest(&mut self, chunk: &[u8]) -> Option<Vec<u8>> {
        self.buffer.extend_from_slice(chunk);
        if self.buffer.len() > MAX_BUFFER {
            let excess = self.buffer.len() - MAX_BUFFER;
            self.buffer.drain(0..excess);
        }
        self.scan()
    }

    fn scan(&mut self) -> Option<Vec<u8>> {
        // Wait for more bytes if we couldn't possibly hold either a full
        // expected-length frame or a minimal 5-byte exception frame yet.
        let floor = match self.expected_length {
            ExpectedLength::Known(n) => n.min(MIN_EXCEPTION_FRAME_LEN),
            _ => MIN_EXCEPTION_FRAME_LEN,
        };
        if self.buffer.len() < floor {
            return None;
        }

        let mut i = 0;
        while i + MIN_EXCEPTION_FRAME_LEN <= self.buffer.len() {
            let u = self.buffer[i];
            let f = self.buffer[i + 1];

            if u != self.unit_id {
                i += 1;
                continue;
            }

            if f == self.function.code() {
                if let Some(end) = self.match_success(i) {
                    return Some(self.emit(i, end));
                }
                i += 1;
                continue;
            }

            if f == (0x80 | self.function.code()) {
                let end = i + MIN_EXCEPTION_FRAME_LEN;
                if end <= self.buffer.len() {
                    return Some(self.emit(i, end));
                }
                i += 1;
                continue;
            }

            if f == (0x7F & self.function.code()) {
                // Header tentatively matches; wait for more bytes rather
                // than advancing past what might be a genuine partial
                // frame.
                break;
            }

            i += 1;
        }

        None
    }

    /// Returns the exclusive end offset of a candidate frame starting at
    /// `i`, or `None` if the buffer doesn't yet hold enough of it.
    fn match_success(&self, i: usize) -> Option<usize> {
        match self.function {
            FunctionCode::ReadDeviceIdentification => {
                if i + DEVICE_ID_HEADER_LEN > self.buffer.len() {
                    return None;
                }
                let num_objects = self.buffer[i + 7] as usize;
                let mut offset = i + DEVICE_ID_HEADER_LEN;
                for _ in 0..num_objects {
                    if offset + 2 > self.buffer.len() {
                        return None;
                    }
                    let object_len = self.buffer[offset + 1] as usize;
                    offset += 2 + object_len;
                    if offset > self.buffer.len() {
                        return None;
                    }
                }
                let end = offset + 2;
                (end <= self.buffer.len()).then_some(end)
            }
            FunctionCode::ReadFileRecord => {
                if i + 4 > self.buffer.len() {
                    return None;
                }
                let sub_request_len = self.buffer[i + 3] as usize;
                let end = i + 6 + sub_request_len;
                (end <= self.buffer.len()).then_some(end)
            }
            _ => match self.expected_length {
                ExpectedLength::Known(n) => {
                    let end = i + n;
                    (end <= self.buffer.len()).then_some(end)
                }
                _ => None,
            },
        }
    }

    fn emit(&mut self, start: usize, end: usize) -> Vec<u8> {
        let frame = self.buffer[start..end].to_vec();
        self.buffer.drain(0..end);
        frame
    }
}
