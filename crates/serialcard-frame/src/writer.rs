use std::io::{ErrorKind, Write};

use bytes::BytesMut;
use tracing::debug;

use crate::codec::{encode_frame, MAX_WIRE_SIZE};
use crate::error::{FrameError, Result};

const INITIAL_BUFFER_CAPACITY: usize = 512;

/// Encodes frames and writes each one with a single `write` call.
///
/// Reader devices expect a frame in one piece, so a short write is an
/// error rather than something to resume.
#[derive(Debug)]
pub struct FrameWriter {
    buf: BytesMut,
}

impl Default for FrameWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameWriter {
    /// Create a new frame writer.
    pub fn new() -> Self {
        Self {
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
        }
    }

    /// Encode `payload` and write the whole frame to `dst`.
    ///
    /// Returns the number of wire bytes written (payload + 2).
    pub fn send<W: Write>(&mut self, dst: &mut W, payload: &[u8]) -> Result<usize> {
        self.buf.clear();
        encode_frame(payload, &mut self.buf)?;
        debug_assert!(self.buf.len() <= MAX_WIRE_SIZE);

        let expected = self.buf.len();
        let written = loop {
            match dst.write(&self.buf) {
                Ok(n) => break n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        };

        if written < expected {
            return Err(FrameError::ShortWrite { written, expected });
        }

        self.flush(dst)?;
        debug!(bytes = written, "wrote frame");
        Ok(written)
    }

    fn flush<W: Write>(&mut self, dst: &mut W) -> Result<()> {
        loop {
            match dst.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
    }
}
