use crate::protocol::{DebugInfo, ExpectedLength, FunctionCode};

/// State for the single transaction an [`crate::transaction::Engine`] may
/// have outstanding at a time. `Engine::submit` takes `&mut self`, so the
/// borrow checker already rules out a second submission while this one is
/// live; the slot itself exists to carry correlation ids and the optional
/// debug capture across the wait loop, not to enforce the invariant.
#[derive(Debug, Clone)]
pub struct TransactionSlot {
    /// Monotonic id assigned when the request was written.
    pub write_id: u64,
    /// Monotonic id of the response this slot is waiting on. Equal to
    /// `write_id` in this engine: one write always pairs with one read.
    pub read_id: u64,
    pub unit_id: u8,
    pub function: FunctionCode,
    pub expected_length: ExpectedLength,
    pub debug: Option<DebugInfo>,
}
