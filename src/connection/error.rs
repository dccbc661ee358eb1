//! Transport-level failures raised by [`Connection`](super::Connection).

use std::io;

use thiserror::Error;

use crate::frame::FramingError;

/// Errors raised while moving bytes over a connection.
///
/// Every variant except [`ConnectionError::Framing`] leaves the connection
/// closed: the transport has been released and all further I/O fails with
/// [`ConnectionError::Closed`].
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// I/O was attempted on a connection that is already closed.
    #[error("connection is closed")]
    Closed,

    /// The peer closed the stream before the requested bytes arrived.
    #[error("connection closed by peer")]
    PeerClosed {
        /// Bytes obtained before the stream ended.
        received: usize,
        /// Bytes the read was waiting for.
        expected: usize,
    },

    /// Writing to the transport failed.
    #[error("send error: {0}")]
    Send(#[source] io::Error),

    /// The transport accepted zero bytes for a non-empty write.
    #[error("send error: transport accepted no bytes")]
    WriteZero,

    /// Reading from the transport failed.
    #[error("receive error: {0}")]
    Receive(#[source] io::Error),

    /// An inbound length prefix announced a payload above the configured limit.
    #[error("frame of {size} bytes exceeds the {max} byte limit")]
    OversizedFrame {
        /// Length announced by the prefix.
        size: usize,
        /// Configured maximum payload length.
        max: usize,
    },

    /// An outbound payload could not be framed; nothing was written.
    #[error(transparent)]
    Framing(#[from] FramingError),
}
