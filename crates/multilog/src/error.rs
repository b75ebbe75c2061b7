//! Error and Result types for multilog client operations.

use std::io;
use thiserror::Error;

/// A convenience `Result` type for multilog client operations.
pub type Result<T> = std::result::Result<T, ClientError>;

/// The error type for multilog client operations.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Unrecognized or malformed type descriptor.
    #[error("Invalid type: {0}")]
    InvalidType(String),

    /// Schema construction or arity violation.
    #[error("Schema error: {0}")]
    SchemaError(String),

    /// A value could not be encoded with the requested data type.
    #[error("Encoding error: {0}")]
    EncodingError(String),

    /// A byte slice could not be decoded with the requested data type.
    #[error("Decoding error: {0}")]
    DecodingError(String),

    /// The client is not in a state that permits the operation.
    #[error("Precondition failed: {0}")]
    PreconditionError(String),

    /// Malformed caller input, such as an undersized record buffer.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Failure raised by the RPC transport.
    #[error("Transport error: {0}")]
    TransportError(String),

    /// Failure reported by the remote store.
    #[error("Server error: {0}")]
    ServerError(String),

    /// Underlying I/O error.
    ///
    /// Socket-backed [`RpcService`](crate::rpc::RpcService) implementations
    /// can propagate `io::Error`s with `?` and land here.
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),
}
