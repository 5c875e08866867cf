//! The transport contract consumed by the transaction engine. Concrete
//! transports (serial port I/O, TCP socket, UDP socket, Telnet/C701
//! framing) are external collaborators; this crate provides one real
//! backend ([`serial::SerialTransport`]) and one test backend
//! ([`mock::MockTransport`]) as worked examples of the contract.

pub mod mock;
pub mod serial;

use async_trait::async_trait;

/// Whether a transport hands the engine complete frames already, or raw
/// byte chunks that must be reassembled.
///
/// RTU over a serial line has no inherent framing, so `Buffered`
/// transports route through [`crate::rtu::Reassembler`]. A transport that
/// already delivers one full Modbus ADU per `read_chunk` call (a true
/// Modbus-TCP socket, for instance) reports `PreFramed` and skips
/// reassembly entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    Buffered,
    PreFramed,
}

/// Uniform byte-stream sink/source the transaction engine dispatches
/// requests through. Implementors own the underlying connection; the
/// engine never reaches past this trait to talk to hardware directly.
#[async_trait]
pub trait Transport: Send {
    type Error: std::error::Error + Send + Sync + 'static;

    async fn open(&mut self) -> Result<(), Self::Error>;
    async fn close(&mut self) -> Result<(), Self::Error>;
    fn is_open(&self) -> bool;

    /// Writes a complete outgoing frame. Implementations should flush
    /// before returning.
    async fn write(&mut self, frame: &[u8]) -> Result<(), Self::Error>;

    /// Waits for and returns the next chunk of inbound bytes. May return
    /// a short read; framing is the caller's concern per [`Framing`].
    async fn read_chunk(&mut self) -> Result<Vec<u8>, Self::Error>;

    fn framing(&self) -> Framing;
}
