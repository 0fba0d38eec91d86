/// Errors that can occur during a request/response exchange.
///
/// Every variant is a communication error from the caller's point of view.
/// [`closes_link`](SessionError::closes_link) tells whether the transport
/// tore the link down and must be re-opened before the next exchange.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The link is closed (never opened, closed explicitly, or lost).
    #[error("link not open")]
    NotOpen,

    /// Opening or configuring the link failed.
    #[error("link error: {0}")]
    Link(#[from] serialcard_link::LinkError),

    /// Frame-level error (oversized request, short write, output too small).
    #[error("frame error: {0}")]
    Frame(#[from] serialcard_frame::FrameError),

    /// Waiting for the link to become readable failed.
    #[error("readability wait failed: {0}")]
    WaitFailed(std::io::Error),

    /// The device side closed the link.
    #[error("no response, end of stream; reader not usable anymore")]
    EndOfStream,

    /// The first response read failed.
    #[error("response read failed: {0}")]
    Read(std::io::Error),

    /// The device answered with a single byte, which signals an error.
    #[error("1 byte error response (0x{0:02X})")]
    ErrorResponse(u8),

    /// The declared response length exceeds the caller's output buffer.
    #[error("response of {declared} bytes does not fit output buffer of {capacity}")]
    ResponseTooLarge { declared: usize, capacity: usize },

    /// The link ran dry before the declared response length arrived.
    #[error("response length wrong, is: {received} should be: {declared}")]
    Reassembly { received: usize, declared: usize },

    /// A continuation read failed while reassembling a response.
    #[error("continuation read failed after {received} of {declared} bytes: {source}")]
    ReassemblyRead {
        received: usize,
        declared: usize,
        source: std::io::Error,
    },
}

impl SessionError {
    /// True if the transport closed its link while producing this error.
    pub fn closes_link(&self) -> bool {
        matches!(
            self,
            SessionError::EndOfStream
                | SessionError::Read(_)
                | SessionError::ResponseTooLarge { .. }
                | SessionError::Reassembly { .. }
                | SessionError::ReassemblyRead { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, SessionError>;
