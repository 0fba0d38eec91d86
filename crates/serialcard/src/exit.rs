use std::fmt;
use std::io;

use serialcard_frame::FrameError;
use serialcard_link::LinkError;
use serialcard_reader::ReaderError;
use serialcard_session::SessionError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const HEALTH_CHECK_FAILED: i32 = 30;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

fn io_code(kind: io::ErrorKind) -> i32 {
    match kind {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::NotFound => USAGE,
        _ => INTERNAL,
    }
}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    CliError::new(io_code(err.kind()), format!("{context}: {err}"))
}

pub fn link_error(context: &str, err: LinkError) -> CliError {
    match err {
        LinkError::Open { ref source, .. } => {
            CliError::new(io_code(source.kind()), format!("{context}: {err}"))
        }
        LinkError::NotATerminal { .. } | LinkError::UnsupportedBaudRate(_) => {
            CliError::new(USAGE, format!("{context}: {err}"))
        }
        LinkError::Io(source) => io_error(context, source),
        other => CliError::new(TRANSPORT_ERROR, format!("{context}: {other}")),
    }
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    match err {
        FrameError::Io(source) => io_error(context, source),
        FrameError::PayloadTooLarge { .. } | FrameError::OutputTooSmall { .. } => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        other => CliError::new(TRANSPORT_ERROR, format!("{context}: {other}")),
    }
}

pub fn session_error(context: &str, err: SessionError) -> CliError {
    match err {
        SessionError::Link(err) => link_error(context, err),
        SessionError::Frame(err) => frame_error(context, err),
        SessionError::WaitFailed(source) => io_error(context, source),
        SessionError::ResponseTooLarge { .. } => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        SessionError::EndOfStream | SessionError::ErrorResponse(_) => {
            CliError::new(FAILURE, format!("{context}: {err}"))
        }
        other => CliError::new(TRANSPORT_ERROR, format!("{context}: {other}")),
    }
}

pub fn reader_error(context: &str, err: ReaderError) -> CliError {
    match err {
        ReaderError::Session(err) => session_error(context, err),
        ReaderError::NoDevice(_) => CliError::new(USAGE, format!("{context}: {err}")),
        ReaderError::InvalidAtr(_) => CliError::new(DATA_INVALID, format!("{context}: {err}")),
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn missing_device_is_a_usage_error() {
        let err = link_error(
            "open failed",
            LinkError::Open {
                path: PathBuf::from("/dev/ttyNOPE"),
                source: io::Error::from(io::ErrorKind::NotFound),
            },
        );
        assert_eq!(err.code, USAGE);
        assert!(err.message.contains("/dev/ttyNOPE"));
    }

    #[test]
    fn permission_denied_on_open() {
        let err = link_error(
            "open failed",
            LinkError::Open {
                path: PathBuf::from("/dev/ttyS0"),
                source: io::Error::from(io::ErrorKind::PermissionDenied),
            },
        );
        assert_eq!(err.code, PERMISSION_DENIED);
    }

    #[test]
    fn nested_errors_keep_their_code() {
        let err = reader_error(
            "transmit failed",
            ReaderError::Session(SessionError::Frame(FrameError::PayloadTooLarge {
                size: 70_000,
                max: 65_535,
            })),
        );
        assert_eq!(err.code, DATA_INVALID);

        let err = session_error("transmit failed", SessionError::ErrorResponse(0x6F));
        assert_eq!(err.code, FAILURE);

        let err = session_error(
            "transmit failed",
            SessionError::ResponseTooLarge {
                declared: 300,
                capacity: 258,
            },
        );
        assert_eq!(err.code, DATA_INVALID);

        let err = session_error("transmit failed", SessionError::NotOpen);
        assert_eq!(err.code, TRANSPORT_ERROR);
    }
}
