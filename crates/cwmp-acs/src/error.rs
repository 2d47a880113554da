//! Error types for the walk session.
//!
//! Every variant is session-fatal: the error is surfaced to the device as a
//! fault reply and the walk stops. The tool favors fail-fast diagnosis over
//! recovery.

use cwmp_model::ModelError;
use cwmp_rpc::{CodecError, SoapError};

/// Errors that can abort a walk session.
#[derive(Debug, thiserror::Error)]
pub enum WalkError {
    /// A message arrived in a state where it is not expected.
    #[error("protocol sequence error: {0}")]
    ProtocolSequence(String),

    /// A required field was missing or had the wrong shape.
    #[error("malformed message: {0}")]
    Malformed(String),

    /// A message type other than the three recognized RPCs.
    #[error("unsupported CWMP RPC: {0}")]
    Unsupported(String),

    /// A value-discovery response named a parameter never discovered by name.
    #[error("lookup error: {0}")]
    Lookup(String),

    /// I/O error on the listener or connection.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Transport framing error.
    #[error("transport error: {0}")]
    Codec(#[from] CodecError),
}

impl From<SoapError> for WalkError {
    fn from(err: SoapError) -> Self {
        match err {
            SoapError::UnsupportedRpc(name) => WalkError::Unsupported(name),
            other => WalkError::Malformed(other.to_string()),
        }
    }
}

impl From<ModelError> for WalkError {
    fn from(err: ModelError) -> Self {
        WalkError::Lookup(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, WalkError>;
