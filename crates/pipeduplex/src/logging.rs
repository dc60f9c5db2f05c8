use clap::ValueEnum;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

/// Prefix shared by the CLI and every library crate it drives.
const CRATE_PREFIX: &str = "pipeduplex";

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_filter(self) -> LevelFilter {
        match self {
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}

/// `level` applies to the pipeduplex crates; anything else stays at warn,
/// or quieter if `level` is.
fn log_targets(level: LogLevel) -> Targets {
    let level = level.as_filter();
    Targets::new()
        .with_target(CRATE_PREFIX, level)
        .with_default(level.min(LevelFilter::WARN))
}

/// Install the stderr subscriber. Stdout is reserved for received messages.
///
/// Thread names are kept so receive-loop events (`pipeduplex-recv`) are
/// distinguishable from the main thread.
pub fn init_logging(format: LogFormat, level: LogLevel) {
    let targets = log_targets(level);
    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(false)
        .with_thread_names(true);

    let registry = tracing_subscriber::registry();
    let _ = match format {
        LogFormat::Text => registry.with(layer.with_filter(targets)).try_init(),
        LogFormat::Json => registry
            .with(layer.json().with_filter(targets))
            .try_init(),
    };
}
