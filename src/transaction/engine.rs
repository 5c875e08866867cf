use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::time::Instant;

use crate::enron::EnronConfig;
use crate::error::{ClientError, EngineError, TransactionError};
use crate::protocol::{
    self, decode, encode, DebugInfo, EncodeError, ExpectedLength, FunctionCode, RegisterValue,
    RegisterWriteValues, Request, Response, ResponseKind,
};
use crate::rtu::Reassembler;
use crate::transport::{Framing, Transport};

use super::slot::TransactionSlot;

const DEFAULT_TIMEOUT: Duration = Duration::from_millis(1000);

/// Configuration an [`Engine`] is constructed with. Mirrors the per-device
/// settings a relay would load from its config file, minus anything that
/// belongs to a process rather than a client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub unit_id: u8,
    pub timeout: Duration,
    pub debug: bool,
    pub enron: Option<EnronConfig>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            unit_id: 1,
            timeout: DEFAULT_TIMEOUT,
            debug: false,
            enron: None,
        }
    }
}

/// The result of one write/wait round trip: a complete, framing-correct
/// response frame, still undecoded, plus whatever debug capture was
/// collected along the way. `None` when the request was a broadcast write
/// and no response was ever expected.
pub(crate) struct RoundTrip {
    pub frame: Vec<u8>,
    pub function: FunctionCode,
    pub expected_length: ExpectedLength,
    pub debug: Option<DebugInfo>,
}

/// Drives one Modbus conversation over a single [`Transport`]. Holds at
/// most one outstanding transaction at a time — not by locking, but
/// because every operation borrows `&mut self` for its entire duration,
/// so the borrow checker rejects a second call before the first returns.
pub struct Engine<T: Transport> {
    transport: T,
    unit_id: u8,
    timeout: Duration,
    debug: bool,
    enron: Option<EnronConfig>,
    reassembler: Reassembler,
    next_id: u64,
    current: Option<TransactionSlot>,
    destroyed: bool,
    close_tx: broadcast::Sender<()>,
}

impl<T: Transport> Engine<T> {
    pub fn new(transport: T, config: EngineConfig) -> Self {
        let (close_tx, _) = broadcast::channel(1);
        Self {
            transport,
            unit_id: config.unit_id,
            timeout: config.timeout,
            debug: config.debug,
            enron: config.enron,
            reassembler: Reassembler::new(),
            next_id: 0,
            current: None,
            destroyed: false,
            close_tx,
        }
    }

    pub fn unit_id(&self) -> u8 {
        self.unit_id
    }

    pub fn set_unit_id(&mut self, unit_id: u8) {
        self.unit_id = unit_id;
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    pub fn is_debug_enabled(&self) -> bool {
        self.debug
    }

    pub fn is_open(&self) -> bool {
        !self.destroyed && self.transport.is_open()
    }

    /// A receiver that fires once when the engine is closed or destroyed.
    pub fn subscribe_close(&self) -> broadcast::Receiver<()> {
        self.close_tx.subscribe()
    }

    pub async fn open(&mut self) -> Result<(), EngineError<T::Error>> {
        if self.destroyed {
            return Err(ClientError::PortNotOpen.into());
        }
        self.transport.open().await.map_err(ClientError::Transport)?;
        Ok(())
    }

    pub async fn close(&mut self) -> Result<(), EngineError<T::Error>> {
        self.transport.close().await.map_err(ClientError::Transport)?;
        let _ = self.close_tx.send(());
        Ok(())
    }

    /// Closes the transport and marks the engine permanently unusable;
    /// unlike [`Self::close`], it can't be reopened with a fresh `open`.
    pub async fn destroy(&mut self) -> Result<(), EngineError<T::Error>> {
        self.close().await?;
        self.destroyed = true;
        Ok(())
    }

    // --- Public operations -------------------------------------------

    pub async fn read_coils(
        &mut self,
        addr: u16,
        qty: u16,
    ) -> Result<Response, EngineError<T::Error>> {
        self.submit(Request::ReadCoils { addr, qty }).await
    }

    pub async fn read_discrete_inputs(
        &mut self,
        addr: u16,
        qty: u16,
    ) -> Result<Response, EngineError<T::Error>> {
        self.submit(Request::ReadDiscreteInputs { addr, qty }).await
    }

    pub async fn read_holding_registers(
        &mut self,
        addr: u16,
        qty: u16,
    ) -> Result<Response, EngineError<T::Error>> {
        self.submit(Request::ReadHoldingRegisters { addr, qty }).await
    }

    pub async fn read_input_registers(
        &mut self,
        addr: u16,
        qty: u16,
    ) -> Result<Response, EngineError<T::Error>> {
        self.submit(Request::ReadInputRegisters { addr, qty }).await
    }

    /// Like [`Self::read_holding_registers`], but always decodes the
    /// registers as 32-bit Enron-wide values, regardless of where `addr`
    /// falls in the engine's configured ranges.
    pub async fn read_registers_enron(
        &mut self,
        addr: u16,
        qty: u16,
    ) -> Result<Response, EngineError<T::Error>> {
        let request = Request::ReadHoldingRegisters { addr, qty };
        let rt = self
            .transact(&request)
            .await?
            .expect("ReadHoldingRegisters always expects a response");
        let kind = decode::decode_response_with_width_override(
            &rt.frame,
            self.unit_id,
            rt.function,
            rt.expected_length,
            &request,
            4,
        )?;
        Ok(Response::new(kind, rt.debug))
    }

    pub async fn write_coil(
        &mut self,
        addr: u16,
        value: bool,
    ) -> Result<Response, EngineError<T::Error>> {
        self.submit(Request::WriteSingleCoil { addr, value }).await
    }

    pub async fn write_coils(
        &mut self,
        addr: u16,
        values: Vec<bool>,
    ) -> Result<Response, EngineError<T::Error>> {
        self.submit(Request::WriteMultipleCoils { addr, values }).await
    }

    pub async fn write_register(
        &mut self,
        addr: u16,
        value: u16,
    ) -> Result<Response, EngineError<T::Error>> {
        self.submit(Request::WriteSingleRegister {
            addr,
            value: RegisterValue::Narrow(value),
        })
        .await
    }

    /// Like [`Self::write_register`], but writes a 32-bit Enron-wide value.
    pub async fn write_register_enron(
        &mut self,
        addr: u16,
        value: u32,
    ) -> Result<Response, EngineError<T::Error>> {
        self.submit(Request::WriteSingleRegister {
            addr,
            value: RegisterValue::Wide(value),
        })
        .await
    }

    pub async fn write_registers(
        &mut self,
        addr: u16,
        values: Vec<u16>,
    ) -> Result<Response, EngineError<T::Error>> {
        self.submit(Request::WriteMultipleRegisters {
            addr,
            values: RegisterWriteValues::Words(values),
        })
        .await
    }

    pub async fn read_file_records(
        &mut self,
        reference_type: u8,
        file_num: u16,
        record_num: u16,
        record_len: u8,
    ) -> Result<Response, EngineError<T::Error>> {
        self.submit(Request::ReadFileRecord {
            reference_type,
            file_num,
            record_num,
            record_len,
        })
        .await
    }

    pub async fn read_exception_status(&mut self) -> Result<Response, EngineError<T::Error>> {
        self.submit(Request::ReadExceptionStatus).await
    }

    /// Drives FC43's continuation protocol to completion, merging every
    /// page's objects into one map.
    pub async fn read_device_identification(
        &mut self,
        device_id_code: u8,
    ) -> Result<Response, EngineError<T::Error>> {
        crate::device_id::read_device_identification(self, device_id_code).await
    }

    pub async fn read_compressed(
        &mut self,
        pnu: Vec<u16>,
    ) -> Result<Response, EngineError<T::Error>> {
        self.submit(Request::ReadCompressed { pnu }).await
    }

    /// The single result-returning primitive every operation above is
    /// built on: encode, write, wait for (or reassemble) the matching
    /// response, decode.
    pub async fn submit(&mut self, request: Request) -> Result<Response, EngineError<T::Error>> {
        // FC43 always goes through the continuation driver, even for what
        // looks like a single request, since a page's `more_follows` can't
        // be known until after this round trip.
        if let Request::ReadDeviceIdentification { device_id_code, .. } = request {
            return self.read_device_identification(device_id_code).await;
        }

        let rt = self.transact(&request).await?;
        match rt {
            Some(rt) => {
                let kind = decode::decode_response(
                    &rt.frame,
                    self.unit_id,
                    rt.function,
                    rt.expected_length,
                    &request,
                    self.enron.as_ref(),
                )?;
                Ok(Response::new(kind, rt.debug))
            }
            None => Ok(Response::new(broadcast_result(&request), None)),
        }
    }

    /// Encodes and writes `request`, then waits for a complete matching
    /// frame or the configured timeout — whichever happens first. Returns
    /// `None` for a broadcast write, which never gets a response.
    pub(crate) async fn transact(
        &mut self,
        request: &Request,
    ) -> Result<Option<RoundTrip>, EngineError<T::Error>> {
        if !self.transport.is_open() {
            return Err(ClientError::PortNotOpen.into());
        }

        let encoded = encode(request, self.unit_id, self.enron.as_ref()).map_err(map_encode_err)?;

        self.next_id += 1;
        let write_id = self.next_id;
        let debug = self.debug.then(|| DebugInfo {
            request: encoded.bytes.clone(),
            responses: Vec::new(),
        });
        self.current = Some(TransactionSlot {
            write_id,
            read_id: write_id,
            unit_id: self.unit_id,
            function: encoded.function,
            expected_length: encoded.expected_length,
            debug,
        });

        if self.transport.framing() == Framing::Buffered {
            self.reassembler
                .arm(self.unit_id, encoded.function, encoded.expected_length);
        }

        tracing::debug!(
            write_id,
            unit_id = self.unit_id,
            function = encoded.function.name(),
            "submitting request"
        );
        self.transport
            .write(&encoded.bytes)
            .await
            .map_err(ClientError::Transport)?;

        if matches!(encoded.expected_length, ExpectedLength::Broadcast) {
            self.current = None;
            tracing::trace!(write_id, "broadcast write, no response expected");
            return Ok(None);
        }

        let deadline = Instant::now() + self.timeout;
        loop {
            tokio::select! {
                _ = tokio::time::sleep_until(deadline) => {
                    let slot = self.current.take().expect("armed above");
                    tracing::warn!(write_id, "transaction timed out");
                    let responses = slot.debug.map(|d| d.responses).unwrap_or_default();
                    return Err(TransactionError::TimedOut {
                        request: encoded.bytes,
                        responses,
                    }
                    .into());
                }
                chunk = self.transport.read_chunk() => {
                    let chunk = chunk.map_err(ClientError::Transport)?;
                    if let Some(slot) = self.current.as_mut() {
                        if let Some(debug) = slot.debug.as_mut() {
                            debug.responses.push(chunk.clone());
                        }
                    }
                    let frame = if self.transport.framing() == Framing::Buffered {
                        self.reassembler.ingest(&chunk)
                    } else {
                        Some(chunk)
                    };
                    let Some(frame) = frame else { continue };

                    let slot = self.current.take().expect("armed above");
                    return Ok(Some(RoundTrip {
                        frame,
                        function: slot.function,
                        expected_length: slot.expected_length,
                        debug: slot.debug,
                    }));
                }
            }
        }
    }
}

/// Builds the success result a broadcast write gets, since no device ever
/// echoes one back: it mirrors what was commanded.
fn broadcast_result(request: &Request) -> ResponseKind {
    match *request {
        Request::WriteSingleCoil { addr, value } => ResponseKind::WriteCoil { addr, value },
        Request::WriteSingleRegister { addr, value } => ResponseKind::WriteRegister { addr, value },
        Request::WriteMultipleCoils { addr, ref values } => ResponseKind::WriteMultiple {
            addr,
            count: values.len() as u16,
        },
        Request::WriteMultipleRegisters { addr, ref values } => ResponseKind::WriteMultiple {
            addr,
            count: values.quantity(),
        },
        _ => unreachable!("only writable function codes can broadcast"),
    }
}

fn map_encode_err<E>(err: EncodeError) -> EngineError<E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    match err {
        EncodeError::BadAddress => ClientError::BadAddress.into(),
        EncodeError::BroadcastNotAllowed => ClientError::BroadcastNotAllowed.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::MockTransport;

    fn read_holding_registers_response() -> Vec<u8> {
        vec![0x11, 0x03, 0x04, 0xAE, 0x41, 0x56, 0x52, 0x49, 0xAD]
    }

    #[tokio::test]
    async fn reads_holding_registers_over_mock_transport() {
        let (transport, mut handle) = MockTransport::pair(Framing::Buffered);
        let mut engine = Engine::new(
            transport,
            EngineConfig {
                unit_id: 0x11,
                ..Default::default()
            },
        );
        engine.open().await.unwrap();

        let call = tokio::spawn(async move { engine.read_holding_registers(0x006B, 2).await });
        let written = handle.next_written().await.unwrap();
        assert_eq!(written, vec![0x11, 0x03, 0x00, 0x6B, 0x00, 0x02, 0x76, 0x87]);
        handle.push_inbound(read_holding_registers_response());

        let response = call.await.unwrap().unwrap();
        assert_eq!(
            response.kind,
            ResponseKind::ReadRegisters(protocol::RegisterValues::Narrow(vec![0xAE41, 0x5652]))
        );
    }

    #[tokio::test]
    async fn broadcast_write_succeeds_without_waiting() {
        let (transport, mut handle) = MockTransport::pair(Framing::Buffered);
        let mut engine = Engine::new(
            transport,
            EngineConfig {
                unit_id: 0,
                ..Default::default()
            },
        );
        engine.open().await.unwrap();

        let broadcast = engine.write_coil(0x00AC, true).await.unwrap();
        assert_eq!(
            broadcast.kind,
            ResponseKind::WriteCoil {
                addr: 0x00AC,
                value: true
            }
        );
        let written = handle.try_next_written().unwrap();
        assert_eq!(written, vec![0x00, 0x05, 0x00, 0xAC, 0xFF, 0x00, 0x4D, 0xCA]);
    }

    #[tokio::test(start_paused = true)]
    async fn times_out_when_nothing_arrives() {
        let (transport, _handle) = MockTransport::pair(Framing::Buffered);
        let mut engine = Engine::new(
            transport,
            EngineConfig {
                timeout: Duration::from_millis(50),
                ..Default::default()
            },
        );
        engine.open().await.unwrap();

        let err = engine.read_holding_registers(0, 1).await.unwrap_err();
        match err {
            EngineError::Transaction(TransactionError::TimedOut { .. }) => {}
            other => panic!("expected timeout, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn rejects_submission_when_port_not_open() {
        let (transport, _handle) = MockTransport::pair(Framing::Buffered);
        let mut engine = Engine::new(transport, EngineConfig::default());
        let err = engine.read_holding_registers(0, 1).await.unwrap_err();
        match err {
            EngineError::Client(ClientError::PortNotOpen) => {}
            other => panic!("expected PortNotOpen, got {other:?}"),
        }
    }
}
