use std::time::Duration;

use serialcard_link::LinkConfig;

/// Default time to wait for a response when the caller asks to wait.
pub const DEFAULT_RESPONSE_TIMEOUT: Duration = Duration::from_secs(2);

/// Configuration fixed when a transport is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportConfig {
    /// Line settings for the serial link.
    pub link: LinkConfig,
    /// Readability wait for exchanges with `wait_for_response` set.
    pub response_timeout: Duration,
    /// Pause between writing a request and reading the response.
    pub settle_delay: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            link: LinkConfig::default(),
            response_timeout: DEFAULT_RESPONSE_TIMEOUT,
            settle_delay: Duration::ZERO,
        }
    }
}
