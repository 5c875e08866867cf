use thiserror::Error;

/// Failure submitting a request, detected before any bytes reach the wire.
///
/// Generic over the transport's own error type so each concrete
/// [`crate::transport::Transport`] can report its own I/O failures without
/// this crate boxing them away.
#[derive(Error, Debug)]
pub enum ClientError<E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    #[error("transport is not open")]
    PortNotOpen,

    #[error("address parameter missing or malformed")]
    BadAddress,

    #[error("broadcast address not allowed for this function code")]
    BroadcastNotAllowed,

    #[error("transport error: {0}")]
    Transport(#[from] E),
}
