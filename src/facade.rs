//! Two alternate calling conventions over [`crate::transaction::Engine`]'s
//! single async `submit` primitive: a callback adapter for embedding in
//! otherwise-callback-driven code, and a blocking wrapper for callers with
//! no async runtime of their own.

use std::future::Future;

use tokio::runtime::{Builder, Runtime};

use crate::error::EngineError;
use crate::protocol::{Request, Response};
use crate::transaction::Engine;
use crate::transport::Transport;

/// Runs `future` on the current Tokio runtime and splits its outcome for
/// `callback` once it resolves, Node-style: `(error, value)`, exactly one
/// of which is present. Spawned, so the caller doesn't block waiting for it.
pub fn spawn_with_callback<T, E, F, C>(future: F, callback: C)
where
    T: Send + 'static,
    E: Send + 'static,
    F: Future<Output = Result<T, E>> + Send + 'static,
    C: FnOnce(Option<E>, Option<T>) + Send + 'static,
{
    tokio::spawn(async move {
        match future.await {
            Ok(value) => callback(None, Some(value)),
            Err(err) => callback(Some(err), None),
        }
    });
}

/// Wraps an [`Engine`] with an owned single-threaded runtime so a caller
/// with no async context of its own can drive it with plain blocking
/// calls. Each method blocks the calling thread until the underlying
/// async operation completes.
pub struct BlockingClient<T: Transport> {
    runtime: Runtime,
    engine: Engine<T>,
}

impl<T: Transport> BlockingClient<T> {
    pub fn new(engine: Engine<T>) -> std::io::Result<Self> {
        let runtime = Builder::new_current_thread().enable_time().build()?;
        Ok(Self { runtime, engine })
    }

    pub fn open(&mut self) -> Result<(), EngineError<T::Error>> {
        self.runtime.block_on(self.engine.open())
    }

    pub fn close(&mut self) -> Result<(), EngineError<T::Error>> {
        self.runtime.block_on(self.engine.close())
    }

    pub fn submit(&mut self, request: Request) -> Result<Response, EngineError<T::Error>> {
        self.runtime.block_on(self.engine.submit(request))
    }

    pub fn read_holding_registers(
        &mut self,
        addr: u16,
        qty: u16,
    ) -> Result<Response, EngineError<T::Error>> {
        self.runtime.block_on(self.engine.read_holding_registers(addr, qty))
    }

    pub fn write_register(&mut self, addr: u16, value: u16) -> Result<Response, EngineError<T::Error>> {
        self.runtime.block_on(self.engine.write_register(addr, value))
    }

    /// Gives back direct access to the wrapped engine for operations this
    /// facade doesn't mirror one-for-one.
    pub fn engine_mut(&mut self) -> &mut Engine<T> {
        &mut self.engine
    }
}
