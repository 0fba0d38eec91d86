use serialcard_link::LinkIo;
#[cfg(unix)]
use serialcard_link::SerialLink;
#[cfg(unix)]
use serialcard_session::TransportConfig;
use serialcard_session::{Outcome, Transport};
use tracing::{debug, info};

use crate::atr::{Atr, AtrSource, SyntheticAtr};
use crate::error::Result;
#[cfg(unix)]
use crate::locator::DeviceLocator;
use crate::presence::{AlwaysPresent, Presence, PresenceProbe};

/// A smart-card reader on a serial link.
///
/// Combines a [`Transport`] with the strategies that answer the host's
/// ATR and presence queries. The defaults reproduce the reader firmware's
/// current behavior: a fixed synthetic ATR and a card that is always present.
#[derive(Debug)]
pub struct CardReader<L, A = SyntheticAtr, P = AlwaysPresent> {
    transport: Transport<L>,
    atr_source: A,
    presence: P,
    atr: Option<Atr>,
}

#[cfg(unix)]
impl<A: AtrSource, P: PresenceProbe> CardReader<SerialLink, A, P> {
    /// Locate the device and open a transport to it.
    pub fn connect<D: DeviceLocator + ?Sized>(
        locator: &D,
        config: TransportConfig,
        atr_source: A,
        presence: P,
    ) -> Result<Self> {
        let path = locator.locate()?;
        let transport = Transport::open(&path, config)?;
        info!(?path, "reader connected");
        Ok(Self::new(transport, atr_source, presence))
    }
}

impl<L: LinkIo, A: AtrSource, P: PresenceProbe> CardReader<L, A, P> {
    pub fn new(transport: Transport<L>, atr_source: A, presence: P) -> Self {
        Self {
            transport,
            atr_source,
            presence,
            atr: None,
        }
    }

    /// Obtain the ATR from the configured source and remember it.
    pub fn power_up(&mut self) -> Result<&Atr> {
        let atr = self.atr_source.answer_to_reset(&mut self.transport)?;
        debug!(len = atr.as_bytes().len(), "answer to reset");
        let atr = self.atr.insert(atr);
        Ok(&*atr)
    }

    /// ATR from the last [`power_up`](Self::power_up), if any.
    pub fn atr(&self) -> Option<&Atr> {
        self.atr.as_ref()
    }

    /// Send a command APDU and read the response APDU into `out`.
    ///
    /// Returns the number of response bytes. The read blocks until the
    /// device answers.
    pub fn transmit(&mut self, apdu: &[u8], out: &mut [u8]) -> Result<usize> {
        let outcome = self.transport.exchange(apdu, out, false)?;
        Ok(outcome.output_len())
    }

    /// Like [`transmit`](Self::transmit) but gives up after the response
    /// timeout, reporting the raw [`Outcome`].
    pub fn transmit_wait(&mut self, apdu: &[u8], out: &mut [u8]) -> Result<Outcome> {
        Ok(self.transport.exchange(apdu, out, true)?)
    }

    /// Ask the presence strategy whether a card is in the field.
    pub fn presence(&mut self) -> Result<Presence> {
        self.presence.probe(&mut self.transport)
    }

    /// Shorthand for `presence()?.is_present()`.
    pub fn is_present(&mut self) -> Result<bool> {
        Ok(self.presence()?.is_present())
    }

    /// Close the link and forget the ATR. Safe to call repeatedly.
    pub fn close(&mut self) {
        self.transport.close();
        self.atr = None;
    }

    pub fn is_open(&self) -> bool {
        self.transport.is_open()
    }

    pub fn transport(&self) -> &Transport<L> {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut Transport<L> {
        &mut self.transport
    }
}
