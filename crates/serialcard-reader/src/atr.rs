//! Answer-to-reset values and the strategies that produce them.

use bytes::{BufMut, Bytes, BytesMut};
use serialcard_link::LinkIo;
use serialcard_session::Transport;

use crate::error::{ReaderError, Result};

/// Largest ATR permitted by ISO/IEC 7816-3.
pub const MAX_ATR_SIZE: usize = 33;

/// Most historical bytes T0 can announce.
pub const MAX_HISTORICAL_BYTES: usize = 15;

/// Historical bytes of the reader's default contactless ATR.
pub const DEFAULT_HISTORICAL_BYTES: [u8; 10] =
    [0x53, 0x4F, 0x53, 0x53, 0x45, 0x02, 0x03, 0x25, 0x01, 0x03];

const TS_DIRECT: u8 = 0x3B;
const TS_INVERSE: u8 = 0x3F;

/// An answer-to-reset byte string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Atr(Bytes);

impl Atr {
    /// Wrap raw ATR bytes, checking size and the initial character.
    pub fn new(bytes: impl Into<Bytes>) -> Result<Self> {
        let bytes = bytes.into();
        if bytes.len() < 2 || bytes.len() > MAX_ATR_SIZE {
            return Err(ReaderError::InvalidAtr(format!(
                "length {} outside 2..={MAX_ATR_SIZE}",
                bytes.len()
            )));
        }
        if bytes[0] != TS_DIRECT && bytes[0] != TS_INVERSE {
            return Err(ReaderError::InvalidAtr(format!(
                "initial character 0x{:02X} is neither 0x3B nor 0x3F",
                bytes[0]
            )));
        }
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Historical bytes, as announced by the low nibble of T0.
    pub fn historical_bytes(&self) -> &[u8] {
        let count = (self.0[1] & 0x0F) as usize;
        let interface = interface_bytes_len(&self.0);
        let start = (2 + interface).min(self.0.len());
        let end = (start + count).min(self.0.len());
        &self.0[start..end]
    }
}

/// Count the interface bytes (TA/TB/TC/TD chain) following T0.
fn interface_bytes_len(atr: &[u8]) -> usize {
    let mut len = 0;
    let mut indicator = atr[1];
    let mut pos = 2;
    loop {
        let present = (indicator >> 4).count_ones() as usize;
        len += present;
        if indicator & 0x80 == 0 {
            return len;
        }
        // TD is the last byte of this group.
        pos += present;
        match atr.get(pos - 1) {
            Some(td) => indicator = *td,
            None => return len,
        }
    }
}

/// Produces the ATR reported for the card in the reader.
pub trait AtrSource {
    fn answer_to_reset<L: LinkIo>(&mut self, transport: &mut Transport<L>) -> Result<Atr>;
}

/// A fixed contactless ATR built from configured historical bytes.
///
/// Layout: `3B 8x 80 01 <historical bytes> TCK`, announcing T=0 and T=1,
/// with TCK the XOR of every byte from T0 through the last historical byte.
/// The device is not consulted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntheticAtr {
    historical: Bytes,
}

impl Default for SyntheticAtr {
    fn default() -> Self {
        Self {
            historical: Bytes::from_static(&DEFAULT_HISTORICAL_BYTES),
        }
    }
}

impl SyntheticAtr {
    pub fn new(historical: impl Into<Bytes>) -> Result<Self> {
        let historical = historical.into();
        if historical.len() > MAX_HISTORICAL_BYTES {
            return Err(ReaderError::InvalidAtr(format!(
                "{} historical bytes, max {MAX_HISTORICAL_BYTES}",
                historical.len()
            )));
        }
        Ok(Self { historical })
    }

    pub fn build(&self) -> Atr {
        let mut atr = BytesMut::with_capacity(5 + self.historical.len());
        atr.put_u8(TS_DIRECT);
        atr.put_u8(0x80 | self.historical.len() as u8);
        atr.put_u8(0x80);
        atr.put_u8(0x01);
        atr.put_slice(&self.historical);
        let tck = atr[1..].iter().fold(0u8, |acc, b| acc ^ b);
        atr.put_u8(tck);
        Atr(atr.freeze())
    }
}

impl AtrSource for SyntheticAtr {
    fn answer_to_reset<L: LinkIo>(&mut self, _transport: &mut Transport<L>) -> Result<Atr> {
        Ok(self.build())
    }
}
