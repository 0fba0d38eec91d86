//! Serial link to a smart-card reader device.
//!
//! This is the lowest layer of serialcard. It opens a character device,
//! checks that it is a terminal, and puts it into a fixed raw mode:
//! - no input or output post-processing, no software flow control
//! - 8 data bits, no parity
//! - `VMIN = 2`, `VTIME = 0` (a read returns once a length prefix is available)
//! - 115200 baud unless configured otherwise
//!
//! Everything above this layer talks to the device through [`LinkIo`].

pub mod config;
pub mod error;
pub mod traits;

#[cfg(unix)]
pub mod serial;

pub use config::{LinkConfig, DEFAULT_BAUD_RATE, DEFAULT_MIN_READ};
pub use error::{LinkError, Result};
pub use traits::LinkIo;

#[cfg(unix)]
pub use serial::SerialLink;
