use bytes::Bytes;
use serialcard_link::LinkIo;
use serialcard_session::{Outcome, SessionError, Transport};
use tracing::{debug, warn};

use crate::error::Result;

/// Largest presence answer inspected; longer answers still count as present.
const PRESENCE_BUFFER_SIZE: usize = 258;

/// Whether a card is in the reader field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    Present,
    Absent,
}

impl Presence {
    pub fn is_present(self) -> bool {
        matches!(self, Presence::Present)
    }
}

/// Answers the host's card presence polling.
pub trait PresenceProbe {
    fn probe<L: LinkIo>(&mut self, transport: &mut Transport<L>) -> Result<Presence>;
}

/// Reports a card as always present without touching the link.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysPresent;

impl PresenceProbe for AlwaysPresent {
    fn probe<L: LinkIo>(&mut self, _transport: &mut Transport<L>) -> Result<Presence> {
        Ok(Presence::Present)
    }
}

/// Asks the device with a presence command.
///
/// The exchange waits for a reply. No reply, an empty reply, or a single
/// `0x00` byte means absent; any other reply means present. Communication
/// errors also count as absent, except a closed link, which is returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollingPresence {
    command: Bytes,
}

impl PollingPresence {
    pub fn new(command: impl Into<Bytes>) -> Self {
        Self {
            command: command.into(),
        }
    }

    pub fn command(&self) -> &[u8] {
        &self.command
    }
}

impl PresenceProbe for PollingPresence {
    fn probe<L: LinkIo>(&mut self, transport: &mut Transport<L>) -> Result<Presence> {
        let mut response = [0u8; PRESENCE_BUFFER_SIZE];
        let presence = match transport.exchange(&self.command, &mut response, true) {
            Ok(Outcome::Empty) | Ok(Outcome::Data(0)) => Presence::Absent,
            Ok(Outcome::Data(1)) if response[0] == 0 => Presence::Absent,
            Ok(Outcome::Data(_)) => Presence::Present,
            Err(SessionError::NotOpen) => return Err(SessionError::NotOpen.into()),
            Err(err) => {
                warn!(error = %err, "presence poll failed, reporting absent");
                Presence::Absent
            }
        };
        debug!(?presence, "presence poll");
        Ok(presence)
    }
}
