use pipeduplex_channel::{ChannelConfig, DuplexChannel, OpenOrder};
use pipeduplex_frame::FrameConfig;
use tracing::{debug, info, warn};

use crate::cmd::{classify_recv_error, install_ctrlc_handler, EchoArgs, RecvDisposition};
use crate::exit::{channel_error, CliResult, SUCCESS};

pub fn run(args: EchoArgs, frame: FrameConfig) -> CliResult<i32> {
    let config = ChannelConfig {
        frame,
        open_order: OpenOrder::ReaderFirst,
    };
    let mut channel = DuplexChannel::open_with_config(&args.inbound, &args.outbound, config)
        .map_err(|err| channel_error("open failed", err))?;
    install_ctrlc_handler(channel.shutdown_handle())?;

    let outcome = echo_loop(&mut channel, &args.prefix);
    let closed = channel
        .close()
        .map_err(|err| channel_error("close failed", err));
    let echoed = settle(outcome, closed)?;

    info!(echoed, "echo finished");
    Ok(SUCCESS)
}

/// The loop error wins; a close failure behind it is logged, not dropped.
fn settle(outcome: CliResult<u64>, closed: CliResult<()>) -> CliResult<u64> {
    match (outcome, closed) {
        (Err(err), Err(close)) => {
            warn!(error = %close.message, code = close.code, "close failed after echo error");
            Err(err)
        }
        (outcome, closed) => {
            let echoed = outcome?;
            closed?;
            Ok(echoed)
        }
    }
}

fn echo_loop(channel: &mut DuplexChannel, prefix: &str) -> CliResult<u64> {
    let mut echoed = 0u64;
    loop {
        let message = match channel.receive_one() {
            Ok(Some(message)) => message,
            Ok(None) => return Ok(echoed),
            Err(err) => match classify_recv_error(err) {
                RecvDisposition::Stop => {
                    info!("echo interrupted");
                    return Ok(echoed);
                }
                RecvDisposition::Skip(reason) => {
                    warn!(%reason, "skipping unreadable message");
                    continue;
                }
                RecvDisposition::Fatal(err) => return Err(err),
            },
        };

        debug!(size = message.len(), "echoing message");
        channel
            .send(&format!("{prefix}{message}"))
            .map_err(|err| channel_error("echo send failed", err))?;
        echoed += 1;
    }
}
