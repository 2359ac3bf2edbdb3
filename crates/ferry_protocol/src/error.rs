//! Error types for the batch protocol.

use thiserror::Error;

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors raised while filling a batch.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// A property snapshot carried no usable `id` key.
    #[error("property map has no `id` entry")]
    MissingId,
}
