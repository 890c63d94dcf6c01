use crate::world::WorldError;
use thiserror::Error;

/// Errors surfaced by the transport, coordinator handle and client.
#[derive(Debug, Error)]
pub enum NetError {
    #[error("coordinator is no longer running")]
    CoordinatorClosed,

    #[error("coordinator task failed: {0}")]
    CoordinatorFailed(#[from] tokio::task::JoinError),

    #[error("join refused: {0}")]
    JoinRefused(#[from] WorldError),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed message: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("message longer than {0} bytes")]
    LineTooLong(usize),

    #[error("expected a snapshot, got '{0}'")]
    UnexpectedMessage(&'static str),

    #[error("connection closed by peer")]
    Closed,
}
