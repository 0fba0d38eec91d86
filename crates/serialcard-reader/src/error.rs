/// Errors that can occur in reader operations.
#[derive(Debug, thiserror::Error)]
pub enum ReaderError {
    /// Exchange-level error.
    #[error("session error: {0}")]
    Session(#[from] serialcard_session::SessionError),

    /// No device could be located.
    #[error("no reader device: {0}")]
    NoDevice(String),

    /// An answer-to-reset could not be built or parsed.
    #[error("invalid ATR: {0}")]
    InvalidAtr(String),
}

pub type Result<T> = std::result::Result<T, ReaderError>;
