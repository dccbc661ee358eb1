//! Length-prefix framing shared by both directions of the protocol.
//!
//! Every message on the wire is a 4-byte big-endian unsigned length followed
//! by exactly that many bytes of UTF-8 JSON:
//!
//! ```text
//! [u32 length N, network order][N bytes of payload]
//! ```

use bytes::{BufMut, Bytes, BytesMut};
use thiserror::Error;

/// Size in bytes of the length prefix preceding every payload.
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Default upper bound for a single inbound payload (16 MiB).
///
/// Length prefixes above the configured maximum are rejected before any
/// payload buffer is allocated.
pub const DEFAULT_MAX_FRAME_LENGTH: usize = 16 * 1024 * 1024;

/// Errors raised while wrapping a payload in a frame.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum FramingError {
    /// The payload cannot be described by a 32-bit length prefix.
    #[error("payload of {size} bytes exceeds the {max} byte frame limit")]
    PayloadTooLarge {
        /// Length of the rejected payload.
        size: usize,
        /// Largest length the prefix can carry.
        max: usize,
    },
}

/// Serialise a payload length in network byte order.
///
/// ```
/// use wirecall::frame::write_length_prefix;
///
/// assert_eq!(write_length_prefix(0x0102_0304), [0x01, 0x02, 0x03, 0x04]);
/// ```
#[must_use]
pub fn write_length_prefix(len: u32) -> [u8; LENGTH_PREFIX_SIZE] {
    #[expect(
        clippy::big_endian_bytes,
        reason = "Network byte order requires big-endian bytes."
    )]
    len.to_be_bytes()
}

/// Parse a payload length from its on-wire representation.
///
/// ```
/// use wirecall::frame::read_length_prefix;
///
/// assert_eq!(read_length_prefix([0, 0, 1, 0]), 256);
/// ```
#[must_use]
pub fn read_length_prefix(bytes: [u8; LENGTH_PREFIX_SIZE]) -> u32 {
    #[expect(
        clippy::big_endian_bytes,
        reason = "Network byte order requires big-endian bytes."
    )]
    u32::from_be_bytes(bytes)
}

/// Prepend a length prefix to `payload`, producing one complete frame.
///
/// # Errors
///
/// Returns [`FramingError::PayloadTooLarge`] if `payload` is longer than
/// `u32::MAX` bytes.
///
/// ```
/// use wirecall::frame::encode_frame;
///
/// let frame = encode_frame(b"{}").expect("small payloads always fit");
/// assert_eq!(&frame[..], &[0, 0, 0, 2, b'{', b'}']);
/// ```
pub fn encode_frame(payload: &[u8]) -> Result<Bytes, FramingError> {
    let len = u32::try_from(payload.len()).map_err(|_| FramingError::PayloadTooLarge {
        size: payload.len(),
        max: u32::MAX as usize,
    })?;
    let mut buf = BytesMut::with_capacity(LENGTH_PREFIX_SIZE + payload.len());
    buf.put_slice(&write_length_prefix(len));
    buf.put_slice(payload);
    Ok(buf.freeze())
}
