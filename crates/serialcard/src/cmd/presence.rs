use serialcard_reader::{AlwaysPresent, PollingPresence, PresenceProbe, SyntheticAtr};

use crate::cmd::{parse_hex, DeviceArgs, PresenceArgs};
use crate::exit::{reader_error, CliResult, SUCCESS};
use crate::output::{print_presence, OutputFormat};

pub fn run(args: PresenceArgs, format: OutputFormat) -> CliResult<i32> {
    match &args.command {
        Some(value) => {
            let command = parse_hex("presence command", value)?;
            probe_once(&args.device, PollingPresence::new(command), format)
        }
        None => probe_once(&args.device, AlwaysPresent, format),
    }
}

fn probe_once<P: PresenceProbe>(
    device: &DeviceArgs,
    probe: P,
    format: OutputFormat,
) -> CliResult<i32> {
    let mut reader = device.connect(SyntheticAtr::default(), probe)?;
    let presence = reader
        .presence()
        .map_err(|err| reader_error("presence check failed", err))?;
    print_presence(device.device()?, presence, None, format);
    Ok(SUCCESS)
}
