use clap::{ArgGroup, Args, Subcommand};
use pipeduplex_channel::ChannelError;
use pipeduplex_frame::FrameConfig;
use std::path::PathBuf;

use crate::exit::{channel_error, CliError, CliResult, INTERNAL};
use crate::output::OutputFormat;

pub mod echo;
pub mod listen;
pub mod mkfifo;
pub mod send;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create named pipes.
    Mkfifo(MkfifoArgs),
    /// Reply to every inbound message on the outbound pipe.
    Echo(EchoArgs),
    /// Send messages to a pipe.
    Send(SendArgs),
    /// Print messages received on a pipe.
    Listen(ListenArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat, frame: FrameConfig) -> CliResult<i32> {
    match command {
        Command::Mkfifo(args) => mkfifo::run(args, format),
        Command::Echo(args) => echo::run(args, frame),
        Command::Send(args) => send::run(args, format, frame),
        Command::Listen(args) => listen::run(args, format, frame),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct MkfifoArgs {
    /// Paths to create.
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,
    /// Permission bits, in octal.
    #[arg(long, default_value = "600", value_parser = parse_mode)]
    pub mode: u32,
}

#[derive(Args, Debug)]
pub struct EchoArgs {
    /// Pipe to read requests from.
    pub inbound: PathBuf,
    /// Pipe to write replies to.
    pub outbound: PathBuf,
    /// Text prepended to every reply.
    #[arg(long, default_value = "")]
    pub prefix: String,
}

#[derive(Args, Debug)]
#[command(group(ArgGroup::new("payload").required(true).args(["json", "data", "file"])))]
pub struct SendArgs {
    /// Pipe to write to.
    pub outbound: PathBuf,
    /// JSON payload, sent in compact form.
    #[arg(long, conflicts_with_all = ["data", "file"])]
    pub json: Option<String>,
    /// Text payload.
    #[arg(long, conflicts_with_all = ["json", "file"])]
    pub data: Option<String>,
    /// Send every line of a file as its own message.
    #[arg(long, conflicts_with_all = ["json", "data"])]
    pub file: Option<PathBuf>,
    /// Wait for one reply and print it.
    #[arg(long, requires = "reply")]
    pub wait: bool,
    /// Pipe to read the reply from when --wait is set.
    #[arg(long, value_name = "PATH")]
    pub reply: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct ListenArgs {
    /// Pipe to read from.
    pub inbound: PathBuf,
    /// Exit after receiving N messages.
    #[arg(long)]
    pub count: Option<u64>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

fn parse_mode(input: &str) -> Result<u32, String> {
    let digits = input.trim_start_matches("0o");
    let mode =
        u32::from_str_radix(digits, 8).map_err(|_| format!("invalid octal mode: {input}"))?;
    if mode > 0o777 {
        return Err(format!("mode out of range: {input}"));
    }
    Ok(mode)
}

/// Route Ctrl-C to a shutdown handle so a blocked receive returns.
pub(crate) fn install_ctrlc_handler(shutdown: pipeduplex_transport::ShutdownHandle) -> CliResult<()> {
    ctrlc::set_handler(move || {
        if let Err(err) = shutdown.shutdown() {
            tracing::warn!(error = %err, "failed to signal shutdown");
        }
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}

pub(crate) enum RecvDisposition {
    /// Stop receiving and exit cleanly.
    Stop,
    /// Log and keep receiving.
    Skip(String),
    Fatal(CliError),
}

/// Decide how a receive loop reacts to a failed receive.
pub(crate) fn classify_recv_error(err: ChannelError) -> RecvDisposition {
    match err {
        ChannelError::Shutdown => RecvDisposition::Stop,
        ChannelError::Frame(frame) if !frame.is_stream_fault() => {
            RecvDisposition::Skip(frame.to_string())
        }
        ChannelError::Json(err) => RecvDisposition::Skip(err.to_string()),
        other => RecvDisposition::Fatal(channel_error("receive failed", other)),
    }
}
