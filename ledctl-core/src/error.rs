//! Error taxonomy for ledctl
//!
//! Every failure is surfaced to the caller as a typed value:
//! - `Transport`: the exchange itself failed (network, timeout, cancellation)
//! - `Decode`: the response bytes could not be interpreted for the operation
//! - `Rejected`: the device answered with a well-formed refusal
//! - `Unauthenticated`: a privileged call was made without a session

use thiserror::Error;

use crate::codec::Operation;

/// Failures raised by a transport adapter
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Request cancelled")]
    Cancelled,
}

impl From<std::io::Error> for TransportError {
    fn from(error: std::io::Error) -> Self {
        match error.kind() {
            std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock => TransportError::Timeout,
            _ => TransportError::Network(error.to_string()),
        }
    }
}

/// Failures turning a response payload into a structured value
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("Response is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    #[error("Unrecognized {operation} response: {payload}")]
    UnrecognizedShape { operation: Operation, payload: String },

    #[error("Unknown actuator state: {0}")]
    InvalidState(String),

    #[error("Login response carried an empty token")]
    EmptyToken,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("Device rejected {operation}: {message}")]
    Rejected { operation: Operation, message: String },

    #[error("Not logged in")]
    Unauthenticated,
}

pub type ClientResult<T> = Result<T, ClientError>;
