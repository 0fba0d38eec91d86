use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};

/// Frame header: big-endian payload length (2) = 2 bytes.
pub const HEADER_SIZE: usize = 2;

/// Largest payload the length prefix can describe.
pub const MAX_PAYLOAD: usize = u16::MAX as usize;

/// Largest possible frame on the wire (header + payload).
pub const MAX_WIRE_SIZE: usize = HEADER_SIZE + MAX_PAYLOAD;

/// A length-prefixed message exchanged with the reader device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// The message payload (command or response APDU).
    pub payload: Bytes,
}

impl Frame {
    /// Create a new frame.
    pub fn new(payload: impl Into<Bytes>) -> Self {
        Self {
            payload: payload.into(),
        }
    }

    /// The total wire size of this frame (header + payload).
    pub fn wire_size(&self) -> usize {
        HEADER_SIZE + self.payload.len()
    }
}

/// Encode a payload into the wire format.
///
/// Wire format:
/// ```text
/// ┌───────────┬───────────┬──────────────────┐
/// │ Len hi    │ Len lo    │ Payload          │
/// │ (1B)      │ (1B)      │ (Length bytes)   │
/// └───────────┴───────────┴──────────────────┘
/// ```
/// The length counts payload bytes only.
pub fn encode_frame(payload: &[u8], dst: &mut BytesMut) -> Result<()> {
    if payload.len() > MAX_PAYLOAD {
        return Err(FrameError::PayloadTooLarge {
            size: payload.len(),
            max: MAX_PAYLOAD,
        });
    }
    dst.reserve(HEADER_SIZE + payload.len());
    dst.put_u16(payload.len() as u16);
    dst.put_slice(payload);
    Ok(())
}

/// Decode a frame from a buffer.
///
/// Returns `None` if the buffer doesn't contain a complete frame yet.
/// On success, consumes the frame bytes from the buffer.
pub fn decode_frame(src: &mut BytesMut) -> Option<Frame> {
    if src.len() < HEADER_SIZE {
        return None;
    }

    let payload_len = declared_length([src[0], src[1]]);
    if src.len() < HEADER_SIZE + payload_len {
        return None;
    }

    src.advance(HEADER_SIZE);
    let payload = src.split_to(payload_len).freeze();
    Some(Frame { payload })
}

/// Payload length announced by a two-byte header.
pub fn declared_length(header: [u8; 2]) -> usize {
    u16::from_be_bytes(header) as usize
}
