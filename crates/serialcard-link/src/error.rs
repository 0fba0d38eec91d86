use std::path::PathBuf;

/// Errors that can occur while opening or configuring a serial link.
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    /// The device node could not be opened.
    #[error("failed to open serial device {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The opened handle does not refer to a terminal-class device.
    #[error("not a serial port: {path}")]
    NotATerminal { path: PathBuf },

    /// Reading the current terminal attributes failed.
    #[error("failed to get options for serial port {path}: {source}")]
    GetAttributes {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Setting the input or output line speed failed.
    #[error("failed to set speed {baud_rate} on serial port {path}: {source}")]
    SetSpeed {
        path: PathBuf,
        baud_rate: u32,
        source: std::io::Error,
    },

    /// Committing the raw-mode attributes failed.
    #[error("failed to set options for serial port {path}: {source}")]
    SetAttributes {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The requested baud rate has no termios speed constant.
    #[error("unsupported baud rate {0}")]
    UnsupportedBaudRate(u32),

    /// An I/O error occurred on the link handle.
    #[error("link I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, LinkError>;
