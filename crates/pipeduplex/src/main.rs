mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;
use pipeduplex_frame::{FrameConfig, DEFAULT_MAX_LINE};

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(
    name = "pipeduplex",
    version,
    about = "Duplex line messaging over named pipes"
)]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(
        long,
        value_name = "FORMAT",
        default_value = "text",
        env = "PIPEDUPLEX_LOG_FORMAT",
        global = true
    )]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(
        long,
        value_name = "LEVEL",
        default_value = "info",
        env = "PIPEDUPLEX_LOG_LEVEL",
        global = true
    )]
    log_level: LogLevel,

    /// Maximum message length in bytes, excluding the newline.
    #[arg(
        long,
        value_name = "BYTES",
        default_value_t = DEFAULT_MAX_LINE,
        env = "PIPEDUPLEX_MAX_LINE_LENGTH",
        global = true
    )]
    max_line_length: usize,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let frame = FrameConfig {
        max_line_length: cli.max_line_length,
    };
    let result = cmd::run(cli.command, format, frame);

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}
