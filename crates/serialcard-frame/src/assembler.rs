//! Reassembly of a response frame that arrives across several reads.
//!
//! The first read carries the two-byte length prefix and possibly part of
//! the payload. The assembler copies payload bytes straight into the
//! caller's output buffer and tracks how much is still owed, so continuation
//! reads can target the unfilled tail of that buffer directly.

use tracing::debug;

use crate::codec::{declared_length, HEADER_SIZE};
use crate::error::{FrameError, Result};

/// Reassembly state for one incoming frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameAssembler {
    declared: usize,
    filled: usize,
}

impl FrameAssembler {
    /// Start reassembly from the first read of a response.
    ///
    /// `first_read` must hold at least the two header bytes. The declared
    /// length is checked against `capacity` before any byte is copied.
    pub fn begin(first_read: &[u8], capacity: usize) -> Result<Self> {
        if first_read.len() < HEADER_SIZE {
            return Err(FrameError::TruncatedHeader {
                received: first_read.len(),
            });
        }

        let declared = declared_length([first_read[0], first_read[1]]);
        if declared > capacity {
            return Err(FrameError::OutputTooSmall { declared, capacity });
        }

        Ok(Self {
            declared,
            filled: 0,
        })
    }

    /// Copy payload bytes into `out`, never past the declared length.
    ///
    /// Returns the number of surplus bytes in `chunk` that were discarded.
    pub fn push(&mut self, chunk: &[u8], out: &mut [u8]) -> usize {
        let take = chunk.len().min(self.remaining());
        out[self.filled..self.filled + take].copy_from_slice(&chunk[..take]);
        self.filled += take;
        chunk.len() - take
    }

    /// The part of `out` still waiting for payload bytes.
    ///
    /// Reading directly into this slice bounds a continuation read to the
    /// bytes the frame still owes.
    pub fn unfilled<'a>(&self, out: &'a mut [u8]) -> &'a mut [u8] {
        &mut out[self.filled..self.declared]
    }

    /// Record `n` bytes written into the slice returned by [`unfilled`](Self::unfilled).
    pub fn advance(&mut self, n: usize) {
        debug_assert!(n <= self.remaining());
        self.filled += n.min(self.remaining());
        debug!(
            filled = self.filled,
            declared = self.declared,
            "reassembled continuation bytes"
        );
    }

    /// Payload length announced by the header.
    pub fn declared(&self) -> usize {
        self.declared
    }

    /// Payload bytes delivered so far.
    pub fn filled(&self) -> usize {
        self.filled
    }

    /// Payload bytes still owed.
    pub fn remaining(&self) -> usize {
        self.declared - self.filled
    }

    /// True once the delivered byte count equals the declared length.
    pub fn is_complete(&self) -> bool {
        self.filled == self.declared
    }
}
