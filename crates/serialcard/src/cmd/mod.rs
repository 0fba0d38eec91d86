use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Args, Subcommand};
use serialcard_link::{LinkConfig, SerialLink, DEFAULT_BAUD_RATE};
use serialcard_reader::{AtrSource, CardReader, FixedDevice, PresenceProbe};
use serialcard_session::TransportConfig;

use crate::exit::{reader_error, CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod atr;
pub mod doctor;
pub mod poll;
pub mod presence;
pub mod transmit;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Send a command APDU and print the response.
    Transmit(TransmitArgs),
    /// Print the answer-to-reset reported for the card.
    Atr(AtrArgs),
    /// Check once whether a card is present.
    Presence(PresenceArgs),
    /// Poll card presence until interrupted.
    Poll(PollArgs),
    /// Check that the device can be opened and configured.
    Doctor(DoctorArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Transmit(args) => transmit::run(args, format),
        Command::Atr(args) => atr::run(args, format),
        Command::Presence(args) => presence::run(args, format),
        Command::Poll(args) => poll::run(args, format),
        Command::Doctor(args) => doctor::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

/// Options shared by every command that opens the reader.
#[derive(Args, Debug, Default)]
pub struct DeviceArgs {
    /// Serial device of the reader (e.g. /dev/ttyUSB0).
    #[arg(long, short = 'd', env = "SERIALCARD_DEVICE", value_name = "PATH")]
    pub device: Option<PathBuf>,
    /// Line speed.
    #[arg(long, default_value_t = DEFAULT_BAUD_RATE)]
    pub baud: u32,
    /// Response timeout for waiting exchanges (e.g. 2s, 500ms).
    #[arg(long, default_value = "2s")]
    pub timeout: String,
    /// Pause between sending a command and reading its response.
    #[arg(long, value_name = "DURATION")]
    pub settle: Option<String>,
}

impl DeviceArgs {
    pub fn device(&self) -> CliResult<&Path> {
        self.device.as_deref().ok_or_else(|| {
            CliError::new(
                USAGE,
                "no reader device; pass --device or set SERIALCARD_DEVICE",
            )
        })
    }

    pub fn transport_config(&self) -> CliResult<TransportConfig> {
        if !LinkConfig::is_supported_baud_rate(self.baud) {
            return Err(CliError::new(
                USAGE,
                format!("unsupported baud rate {}", self.baud),
            ));
        }
        let settle_delay = match &self.settle {
            Some(value) => parse_duration(value)?,
            None => Duration::ZERO,
        };
        Ok(TransportConfig {
            link: LinkConfig::with_baud_rate(self.baud),
            response_timeout: parse_duration(&self.timeout)?,
            settle_delay,
        })
    }

    /// Open the configured device as a card reader.
    pub fn connect<A: AtrSource, P: PresenceProbe>(
        &self,
        atr_source: A,
        presence: P,
    ) -> CliResult<CardReader<SerialLink, A, P>> {
        let locator = FixedDevice::new(self.device()?);
        let config = self.transport_config()?;
        CardReader::connect(&locator, config, atr_source, presence)
            .map_err(|err| reader_error("open failed", err))
    }
}

#[derive(Args, Debug)]
pub struct TransmitArgs {
    #[command(flatten)]
    pub device: DeviceArgs,
    /// Command APDU as hex (spaces and colons allowed).
    pub apdu: String,
    /// Give up after the response timeout instead of blocking.
    #[arg(long)]
    pub wait: bool,
    /// Largest response accepted, in bytes.
    #[arg(long, default_value_t = serialcard_frame::MAX_PAYLOAD)]
    pub max_response: usize,
}

#[derive(Args, Debug)]
pub struct AtrArgs {
    #[command(flatten)]
    pub device: DeviceArgs,
    /// Historical bytes for the synthetic ATR, as hex.
    #[arg(long, value_name = "HEX")]
    pub historical: Option<String>,
}

#[derive(Args, Debug)]
pub struct PresenceArgs {
    #[command(flatten)]
    pub device: DeviceArgs,
    /// Presence command sent to the device, as hex. Without it the card is
    /// always reported present.
    #[arg(long, value_name = "HEX")]
    pub command: Option<String>,
}

#[derive(Args, Debug)]
pub struct PollArgs {
    #[command(flatten)]
    pub device: DeviceArgs,
    /// Presence command sent to the device, as hex.
    #[arg(long, value_name = "HEX")]
    pub command: Option<String>,
    /// Time between polls (e.g. 1s, 250ms).
    #[arg(long, default_value = "1s")]
    pub interval: String,
    /// Exit after N polls.
    #[arg(long)]
    pub count: Option<u64>,
    /// Only print when presence changes.
    #[arg(long)]
    pub changes_only: bool,
}

#[derive(Args, Debug, Default)]
pub struct DoctorArgs {
    #[command(flatten)]
    pub device: DeviceArgs,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        _ => Ok(Duration::from_secs(value)),
    }
}

/// Decode hex bytes, ignoring whitespace and `:` separators.
pub fn parse_hex(what: &str, input: &str) -> CliResult<Vec<u8>> {
    let digits: String = input
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ':')
        .collect();
    hex::decode(&digits).map_err(|err| CliError::new(USAGE, format!("{what} is not valid hex: {err}")))
}
