use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, trace};

use crate::config::{DataBits, Parity, StopBits};

use super::{Framing, Transport};

#[derive(Error, Debug)]
pub enum SerialTransportError {
    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serial port is not open")]
    NotOpen,
}

/// RTU over a real serial port. The port's internal read timeout is kept
/// short so the blocking `read`/`write_all` calls yield control back to
/// the runtime regularly instead of starving it.
pub struct SerialTransport {
    device: String,
    baud_rate: u32,
    data_bits: DataBits,
    parity: Parity,
    stop_bits: StopBits,
    port_read_timeout: Duration,
    port: Option<Box<dyn serialport::SerialPort>>,
}

impl SerialTransport {
    pub fn new(device: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            device: device.into(),
            baud_rate,
            data_bits: DataBits::default(),
            parity: Parity::default(),
            stop_bits: StopBits::default(),
            port_read_timeout: Duration::from_millis(100),
            port: None,
        }
    }

    pub fn with_port_read_timeout(mut self, timeout: Duration) -> Self {
        self.port_read_timeout = timeout;
        self
    }

    pub fn with_data_bits(mut self, data_bits: DataBits) -> Self {
        self.data_bits = data_bits;
        self
    }

    pub fn with_parity(mut self, parity: Parity) -> Self {
        self.parity = parity;
        self
    }

    pub fn with_stop_bits(mut self, stop_bits: StopBits) -> Self {
        self.stop_bits = stop_bits;
        self
    }
}

#[async_trait]
impl Transport for SerialTransport {
    type Error = SerialTransportError;

    async fn open(&mut self) -> Result<(), Self::Error> {
        let port = serialport::new(&self.device, self.baud_rate)
            .data_bits(self.data_bits.into())
            .parity(self.parity.into())
            .stop_bits(self.stop_bits.into())
            .timeout(self.port_read_timeout)
            .open()?;
        debug!(device = %self.device, baud_rate = self.baud_rate, "serial port opened");
        self.port = Some(port);
        Ok(())
    }

    async fn close(&mut self) -> Result<(), Self::Error> {
        self.port = None;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.port.is_some()
    }

    async fn write(&mut self, frame: &[u8]) -> Result<(), Self::Error> {
        let port = self.port.as_mut().ok_or(SerialTransportError::NotOpen)?;
        port.write_all(frame)?;
        port.flush()?;
        trace!(bytes = frame.len(), "wrote frame to serial port");
        Ok(())
    }

    async fn read_chunk(&mut self) -> Result<Vec<u8>, Self::Error> {
        let port = self.port.as_mut().ok_or(SerialTransportError::NotOpen)?;
        let mut buf = vec![0u8; 256];
        loop {
            match port.read(&mut buf) {
                Ok(0) => continue,
                Ok(n) => {
                    buf.truncate(n);
                    trace!(bytes = n, "read chunk from serial port");
                    return Ok(buf);
                }
                Err(ref err) if err.kind() == std::io::ErrorKind::TimedOut => {
                    // Yield between blocking reads so the engine's timeout
                    // race (tokio::select! against sleep_until) gets a
                    // chance to win even while this loop keeps retrying.
                    tokio::task::yield_now().await;
                    continue;
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    fn framing(&self) -> Framing {
        Framing::Buffered
    }
}
