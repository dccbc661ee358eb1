//! Errors raised by [`RpcServer`](super::RpcServer) operations.

use std::{io, net::SocketAddr};

use thiserror::Error;
use tokio::task::JoinError;

/// Errors that may occur while configuring or running the server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// A function was registered after the server started listening.
    #[error("server already running; functions must be registered before start")]
    AlreadyRunning,

    /// The server has been stopped and cannot be started or reconfigured.
    #[error("server has been stopped")]
    Stopped,

    /// Binding or configuring the listening socket failed.
    #[error("failed to listen on {addr}: {source}")]
    Bind {
        /// Address the server attempted to bind.
        addr: SocketAddr,
        /// Underlying socket error.
        #[source]
        source: io::Error,
    },

    /// The accept loop task ended abnormally.
    #[error("accept loop terminated abnormally: {0}")]
    AcceptTask(#[from] JoinError),
}
