//! Request/response exchanges with a serial card reader.
//!
//! A [`Transport`] owns an open link and runs one exchange at a time:
//! frame and write the request, optionally wait for the device to answer,
//! then read and reassemble the length-prefixed response into a
//! caller-supplied buffer.
//!
//! Outcomes:
//! - [`Outcome::Data`]: the device answered with a complete frame
//! - [`Outcome::Empty`]: nothing arrived within the response timeout
//! - [`SessionError`]: communication failed; if
//!   [`SessionError::closes_link`] is true the link is gone

pub mod config;
pub mod error;
pub mod transport;

pub use config::{TransportConfig, DEFAULT_RESPONSE_TIMEOUT};
pub use error::{Result, SessionError};
pub use transport::{Outcome, Transport};
