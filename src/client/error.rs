//! Error types for [`RpcClient`](super::RpcClient) calls.

use std::io;

use crate::{
    connection::ConnectionError,
    envelope::{DecodeError, EncodeError},
};

/// Errors emitted by [`RpcClient`](super::RpcClient).
///
/// Error responses carry only a message, so the remote variants are
/// recovered from its leading text.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The TCP connection could not be established.
    #[error("failed to connect: {0}")]
    Connect(#[source] io::Error),
    /// Sending the request or reading the response failed.
    #[error("transport error: {0}")]
    Connection(#[from] ConnectionError),
    /// The request could not be serialised.
    #[error("failed to encode request: {0}")]
    Encode(#[from] EncodeError),
    /// The server's reply was not a valid response envelope.
    #[error("malformed response: {0}")]
    Protocol(#[from] DecodeError),
    /// The server has no function with the requested name.
    #[error("function not found: {0}")]
    FunctionNotFound(String),
    /// The function rejected its arguments or failed while running.
    #[error("{0}")]
    Execution(String),
    /// The server rejected the request itself.
    #[error("server rejected request: {0}")]
    Remote(String),
}

impl ClientError {
    /// Classify an error response for a call to `function`.
    #[must_use]
    pub fn from_remote(function: &str, message: String) -> Self {
        if message == "Function not found" {
            Self::FunctionNotFound(function.to_owned())
        } else if message.starts_with("Execution error: ") {
            Self::Execution(message)
        } else {
            Self::Remote(message)
        }
    }
}
