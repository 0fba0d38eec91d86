//! Serial transport for smart-card reader devices.
//!
//! serialcard drives readers that speak a 2-byte length-prefixed protocol
//! over a raw serial line: frame a command, send it, reassemble the answer.
//!
//! # Crate Structure
//!
//! - [`link`]: Serial device configuration and I/O (termios raw mode)
//! - [`frame`]: Length-prefixed framing and response reassembly
//! - [`session`]: Request/response exchanges and link lifecycle
//! - [`reader`]: Card reader facade with ATR and presence strategies (behind `reader` feature)

/// Re-export link types.
pub mod link {
    pub use serialcard_link::*;
}

/// Re-export frame types.
pub mod frame {
    pub use serialcard_frame::*;
}

/// Re-export session types.
pub mod session {
    pub use serialcard_session::*;
}

/// Re-export reader types (requires `reader` feature).
#[cfg(feature = "reader")]
pub mod reader {
    pub use serialcard_reader::*;
}
