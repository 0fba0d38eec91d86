/// Default line speed for reader devices.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Default `VMIN`: a read returns once at least this many bytes are available.
///
/// Two bytes is the size of a frame length prefix.
pub const DEFAULT_MIN_READ: u8 = 2;

/// Raw-mode parameters applied when a link is opened.
///
/// Everything else about the line discipline is fixed: 8-N-1, no flow
/// control, no input or output post-processing, inter-character timer off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkConfig {
    /// Input and output baud rate.
    pub baud_rate: u32,
    /// Minimum number of bytes before a blocking read returns (`VMIN`).
    pub min_read: u8,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            baud_rate: DEFAULT_BAUD_RATE,
            min_read: DEFAULT_MIN_READ,
        }
    }
}

impl LinkConfig {
    /// Baud rates accepted by [`LinkConfig::baud_rate`].
    pub const SUPPORTED_BAUD_RATES: &'static [u32] = &[
        1_200, 2_400, 4_800, 9_600, 19_200, 38_400, 57_600, 115_200, 230_400,
    ];

    /// Config with an explicit baud rate and default `VMIN`.
    pub fn with_baud_rate(baud_rate: u32) -> Self {
        Self {
            baud_rate,
            ..Self::default()
        }
    }

    /// Returns true if `baud_rate` maps to a termios speed constant.
    pub fn is_supported_baud_rate(baud_rate: u32) -> bool {
        Self::SUPPORTED_BAUD_RATES.contains(&baud_rate)
    }
}
