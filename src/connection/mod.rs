//! Exclusive ownership of one duplex byte stream.
//!
//! [`Connection`] turns an unreliable stream of partial reads and writes into
//! whole-buffer operations and applies the 4-byte length-prefix framing.
//! Short reads and writes are looped over, `ErrorKind::Interrupted` is
//! retried, and any other failure releases the transport. Once a connection
//! is closed it stays closed.

mod error;

use std::io;

pub use error::ConnectionError;
use log::{debug, warn};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::frame::{
    DEFAULT_MAX_FRAME_LENGTH,
    LENGTH_PREFIX_SIZE,
    encode_frame,
    read_length_prefix,
};

/// A framed connection over any async byte stream.
///
/// The transport is held in an `Option`; taking it out is the only way the
/// connection closes, so a closed connection can never reopen and the
/// transport is released exactly once, either by [`Connection::close`], on
/// the first I/O failure, or when the `Connection` is dropped.
#[derive(Debug)]
pub struct Connection<T> {
    transport: Option<T>,
    max_frame_length: usize,
}

impl<T> Connection<T> {
    /// Wrap an accepted or connected transport.
    #[must_use]
    pub fn new(transport: T) -> Self {
        Self {
            transport: Some(transport),
            max_frame_length: DEFAULT_MAX_FRAME_LENGTH,
        }
    }

    /// Set the largest inbound payload [`Connection::receive_payload`] accepts.
    #[must_use]
    pub fn with_max_frame_length(mut self, max_frame_length: usize) -> Self {
        self.max_frame_length = max_frame_length;
        self
    }

    /// Largest inbound payload accepted by this connection.
    #[must_use]
    pub const fn max_frame_length(&self) -> usize { self.max_frame_length }

    /// Whether the connection is still usable for I/O.
    #[must_use]
    pub const fn is_open(&self) -> bool { self.transport.is_some() }

    /// Borrow the transport while the connection is open.
    #[must_use]
    pub fn get_ref(&self) -> Option<&T> { self.transport.as_ref() }

    fn transport_mut(&mut self) -> Result<&mut T, ConnectionError> {
        self.transport.as_mut().ok_or(ConnectionError::Closed)
    }

    /// Drop the transport if `result` failed, keeping the error for the caller.
    fn close_on_error<R>(&mut self, result: Result<R, ConnectionError>) -> Result<R, ConnectionError> {
        if result.is_err() {
            self.transport = None;
        }
        result
    }
}

impl<T> Connection<T>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    /// Write every byte of `bytes` to the transport.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionError::Closed`] without touching the transport if
    /// the connection is closed. Any write failure other than an interruption
    /// closes the connection and is returned.
    pub async fn send(&mut self, bytes: &[u8]) -> Result<(), ConnectionError> {
        let transport = self.transport_mut()?;
        let result = write_fully(transport, bytes).await;
        self.close_on_error(result)
    }

    /// Frame `payload` with a length prefix and send it.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionError::Framing`] if the payload is too long to
    /// frame, leaving the connection open; otherwise fails as
    /// [`Connection::send`] does.
    pub async fn send_frame(&mut self, payload: &[u8]) -> Result<(), ConnectionError> {
        self.transport_mut()?;
        let frame = encode_frame(payload)?;
        self.send(&frame).await
    }

    /// Read exactly `len` bytes.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionError::PeerClosed`] if the stream ends first and
    /// [`ConnectionError::Receive`] for other read failures; both close the
    /// connection. Fails with [`ConnectionError::Closed`] if already closed.
    pub async fn receive(&mut self, len: usize) -> Result<Vec<u8>, ConnectionError> {
        let transport = self.transport_mut()?;
        let mut buf = vec![0; len];
        let result = read_fully(transport, &mut buf).await;
        self.close_on_error(result).map(|()| buf)
    }

    /// Read the 4-byte big-endian length prefix of the next message.
    ///
    /// # Errors
    ///
    /// Fails as [`Connection::receive`] does.
    pub async fn receive_length_prefix(&mut self) -> Result<u32, ConnectionError> {
        let transport = self.transport_mut()?;
        let mut header = [0; LENGTH_PREFIX_SIZE];
        let result = read_fully(transport, &mut header).await;
        self.close_on_error(result)
            .map(|()| read_length_prefix(header))
    }

    /// Read a payload whose length was announced by a prefix.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionError::OversizedFrame`] and closes the connection
    /// if `len` exceeds [`Connection::max_frame_length`]; otherwise fails as
    /// [`Connection::receive`] does.
    pub async fn receive_payload(&mut self, len: u32) -> Result<Vec<u8>, ConnectionError> {
        self.transport_mut()?;
        let size = usize::try_from(len).unwrap_or(usize::MAX);
        if size > self.max_frame_length {
            let max = self.max_frame_length;
            return self.close_on_error(Err(ConnectionError::OversizedFrame { size, max }));
        }
        self.receive(size).await
    }

    /// Read one complete framed message and return its payload.
    ///
    /// # Errors
    ///
    /// Fails as [`Connection::receive_length_prefix`] and
    /// [`Connection::receive_payload`] do.
    pub async fn receive_frame(&mut self) -> Result<Vec<u8>, ConnectionError> {
        let len = self.receive_length_prefix().await?;
        self.receive_payload(len).await
    }

    /// Shut down and release the transport.
    ///
    /// Only the first call has an effect. A failed shutdown is logged rather
    /// than returned because the caller has nothing left to do about it.
    pub async fn close(&mut self) {
        let Some(mut transport) = self.transport.take() else {
            return;
        };
        match transport.shutdown().await {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotConnected => {
                debug!("connection already disconnected at close: error={e}");
            }
            Err(e) => warn!("failed to shut down connection: error={e}"),
        }
    }
}

async fn write_fully<W>(writer: &mut W, mut bytes: &[u8]) -> Result<(), ConnectionError>
where
    W: AsyncWrite + Unpin,
{
    while !bytes.is_empty() {
        match writer.write(bytes).await {
            Ok(0) => return Err(ConnectionError::WriteZero),
            Ok(n) => bytes = bytes.get(n..).unwrap_or_default(),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(ConnectionError::Send(e)),
        }
    }
    loop {
        match writer.flush().await {
            Ok(()) => return Ok(()),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(ConnectionError::Send(e)),
        }
    }
}

async fn read_fully<R>(reader: &mut R, buf: &mut [u8]) -> Result<(), ConnectionError>
where
    R: AsyncRead + Unpin,
{
    let expected = buf.len();
    let mut filled = 0;
    while let Some(rest) = buf.get_mut(filled..).filter(|rest| !rest.is_empty()) {
        match reader.read(rest).await {
            Ok(0) => {
                return Err(ConnectionError::PeerClosed {
                    received: filled,
                    expected,
                });
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(ConnectionError::Receive(e)),
        }
    }
    Ok(())
}
