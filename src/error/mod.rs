mod client;
mod engine;
mod transaction;

pub mod kinds;

pub use client::ClientError;
pub use engine::EngineError;
pub use kinds::ExceptionCode;
pub use transaction::TransactionError;
