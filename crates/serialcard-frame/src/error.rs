/// Errors that can occur during frame encoding, writing or reassembly.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The payload does not fit the 16-bit length prefix.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// Fewer than two bytes were available to read a length prefix from.
    #[error("truncated frame header ({received} bytes)")]
    TruncatedHeader { received: usize },

    /// The declared response length exceeds the caller's buffer.
    #[error("response of {declared} bytes does not fit output buffer of {capacity}")]
    OutputTooSmall { declared: usize, capacity: usize },

    /// The link accepted only part of the frame.
    #[error("failed to write {expected} bytes, only wrote {written}")]
    ShortWrite { written: usize, expected: usize },

    /// An I/O error occurred while writing a frame.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, FrameError>;
