use serialcard_reader::{AlwaysPresent, SyntheticAtr};

use crate::cmd::{parse_hex, AtrArgs};
use crate::exit::{reader_error, CliResult, SUCCESS};
use crate::output::{print_atr, OutputFormat};

pub fn run(args: AtrArgs, format: OutputFormat) -> CliResult<i32> {
    let source = match &args.historical {
        Some(value) => SyntheticAtr::new(parse_hex("historical bytes", value)?)
            .map_err(|err| reader_error("invalid historical bytes", err))?,
        None => SyntheticAtr::default(),
    };

    let mut reader = args.device.connect(source, AlwaysPresent)?;
    let atr = reader
        .power_up()
        .map_err(|err| reader_error("power up failed", err))?;
    print_atr(args.device.device()?, atr, format);

    Ok(SUCCESS)
}
