use serialcard_reader::{AlwaysPresent, SyntheticAtr};
use serialcard_session::Outcome;
use tracing::debug;

use crate::cmd::{parse_hex, TransmitArgs};
use crate::exit::{reader_error, CliError, CliResult, SUCCESS, TIMEOUT, USAGE};
use crate::output::{print_response, OutputFormat};

pub fn run(args: TransmitArgs, format: OutputFormat) -> CliResult<i32> {
    let apdu = parse_hex("apdu", &args.apdu)?;
    if apdu.is_empty() {
        return Err(CliError::new(USAGE, "apdu must not be empty"));
    }
    if args.max_response == 0 {
        return Err(CliError::new(USAGE, "--max-response must be greater than zero"));
    }

    let mut reader = args
        .device
        .connect(SyntheticAtr::default(), AlwaysPresent)?;
    let mut out = vec![0u8; args.max_response];

    let result = if args.wait {
        reader.transmit_wait(&apdu, &mut out)
    } else {
        reader.transmit(&apdu, &mut out).map(Outcome::Data)
    };
    let outcome = result.map_err(|err| reader_error("transmit failed", err))?;
    debug!(?outcome, "transmit complete");

    print_response(
        args.device.device()?,
        &apdu,
        outcome.response(&out),
        outcome.is_no_response(),
        format,
    );
    reader.close();

    if outcome.is_no_response() {
        Ok(TIMEOUT)
    } else {
        Ok(SUCCESS)
    }
}
