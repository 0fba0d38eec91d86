//! Length-prefixed framing for serial card reader exchanges.
//!
//! Every message in either direction is framed with a 2-byte big-endian
//! payload length followed by the payload. Responses may arrive split over
//! several reads; [`FrameAssembler`] stitches them back together into the
//! caller's buffer without ever writing past the declared length.

pub mod assembler;
pub mod codec;
pub mod error;
pub mod writer;

pub use assembler::FrameAssembler;
pub use codec::{
    declared_length, decode_frame, encode_frame, Frame, HEADER_SIZE, MAX_PAYLOAD, MAX_WIRE_SIZE,
};
pub use error::{FrameError, Result};
pub use writer::FrameWriter;
