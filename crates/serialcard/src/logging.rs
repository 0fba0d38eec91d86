use clap::ValueEnum;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

/// Crates whose events follow `--log-level`. Everything else is capped at warn.
const OWN_TARGETS: &[&str] = &[
    "serialcard",
    "serialcard_link",
    "serialcard_frame",
    "serialcard_session",
    "serialcard_reader",
];

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}

fn targets(level: LogLevel) -> Targets {
    let own = LevelFilter::from(level);
    let others = own.min(LevelFilter::WARN);
    OWN_TARGETS
        .iter()
        .fold(Targets::new().with_default(others), |filter, target| {
            filter.with_target(*target, own)
        })
}

/// Logs go to stderr; stdout carries command output only.
pub fn init_logging(format: LogFormat, level: LogLevel) {
    let filter = targets(level);
    let registry = tracing_subscriber::registry();

    let _ = match format {
        LogFormat::Text => registry
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_ansi(false)
                    .with_target(false)
                    .with_filter(filter),
            )
            .try_init(),
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_filter(filter),
            )
            .try_init(),
    };
}

#[cfg(test)]
mod tests {
    use tracing::Level;

    use super::*;

    #[test]
    fn own_crates_follow_requested_level() {
        let filter = targets(LogLevel::Debug);
        assert!(filter.would_enable("serialcard_session::transport", &Level::DEBUG));
        assert!(!filter.would_enable("serialcard_session::transport", &Level::TRACE));
    }

    #[test]
    fn other_crates_are_capped_at_warn() {
        let filter = targets(LogLevel::Trace);
        assert!(filter.would_enable("some_dependency", &Level::WARN));
        assert!(!filter.would_enable("some_dependency", &Level::INFO));
    }

    #[test]
    fn quiet_level_applies_everywhere() {
        let filter = targets(LogLevel::Error);
        assert!(!filter.would_enable("some_dependency", &Level::WARN));
        assert!(!filter.would_enable("serialcard_link::serial", &Level::WARN));
    }
}
