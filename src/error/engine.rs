use thiserror::Error;

use super::{ClientError, TransactionError};

/// Everything [`crate::transaction::Engine::submit`] (and the operation
/// methods built on it) can fail with: a submission-time rejection or an
/// in-flight transaction failure.
#[derive(Error, Debug)]
pub enum EngineError<E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    #[error(transparent)]
    Client(#[from] ClientError<E>),

    #[error(transparent)]
    Transaction(#[from] TransactionError),
}
