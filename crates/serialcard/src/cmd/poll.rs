use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use serialcard_reader::{AlwaysPresent, PollingPresence, PresenceProbe, SyntheticAtr};
use tracing::info;

use crate::cmd::{parse_duration, parse_hex, PollArgs};
use crate::exit::{reader_error, CliError, CliResult, INTERNAL, SUCCESS};
use crate::output::{print_presence, OutputFormat};

/// Longest sleep between checks of the interrupt flag.
const SLEEP_SLICE: Duration = Duration::from_millis(50);

pub fn run(args: PollArgs, format: OutputFormat) -> CliResult<i32> {
    let interval = parse_duration(&args.interval)?;
    match &args.command {
        Some(value) => {
            let command = parse_hex("presence command", value)?;
            poll(&args, PollingPresence::new(command), interval, format)
        }
        None => poll(&args, AlwaysPresent, interval, format),
    }
}

fn poll<P: PresenceProbe>(
    args: &PollArgs,
    probe: P,
    interval: Duration,
    format: OutputFormat,
) -> CliResult<i32> {
    let device = args.device.device()?;
    let mut reader = args.device.connect(SyntheticAtr::default(), probe)?;

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let mut sequence = 0u64;
    let mut last = None;

    while running.load(Ordering::SeqCst) {
        let presence = reader
            .presence()
            .map_err(|err| reader_error("presence check failed", err))?;
        sequence = sequence.saturating_add(1);

        if !args.changes_only || last != Some(presence) {
            print_presence(device, presence, Some(sequence), format);
        }
        last = Some(presence);

        if args.count.is_some_and(|count| sequence >= count) {
            break;
        }
        sleep_while_running(interval, &running);
    }

    info!(polls = sequence, "polling stopped");
    reader.close();
    Ok(SUCCESS)
}

fn sleep_while_running(interval: Duration, running: &AtomicBool) {
    let deadline = Instant::now() + interval;
    while running.load(Ordering::SeqCst) {
        let now = Instant::now();
        if now >= deadline {
            return;
        }
        thread::sleep((deadline - now).min(SLEEP_SLICE));
    }
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
