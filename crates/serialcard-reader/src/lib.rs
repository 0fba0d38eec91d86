//! Smart-card reader built on the serialcard transport.
//!
//! The transport only moves frames. Everything a host asks of a reader
//! beyond that is a strategy handed to [`CardReader`]:
//! - [`DeviceLocator`]: which device node to open
//! - [`AtrSource`]: the answer-to-reset reported for the card
//! - [`PresenceProbe`]: whether a card is in the field

pub mod atr;
pub mod error;
pub mod locator;
pub mod presence;
pub mod reader;

pub use atr::{Atr, AtrSource, SyntheticAtr, DEFAULT_HISTORICAL_BYTES, MAX_ATR_SIZE};
pub use error::{ReaderError, Result};
pub use locator::{DeviceLocator, FixedDevice, NoDiscovery};
pub use presence::{AlwaysPresent, PollingPresence, Presence, PresenceProbe};
pub use reader::CardReader;
