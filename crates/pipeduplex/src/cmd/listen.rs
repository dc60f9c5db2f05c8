use pipeduplex_channel::MessageSource;
use pipeduplex_frame::FrameConfig;
use tracing::{info, warn};

use crate::cmd::{classify_recv_error, install_ctrlc_handler, ListenArgs, RecvDisposition};
use crate::exit::{channel_error, CliResult, SUCCESS};
use crate::output::{print_message, OutputFormat};

pub fn run(args: ListenArgs, format: OutputFormat, frame: FrameConfig) -> CliResult<i32> {
    let mut source = MessageSource::open_with_config(&args.inbound, frame)
        .map_err(|err| channel_error("open failed", err))?;
    install_ctrlc_handler(source.shutdown_handle())?;

    let mut printed = 0u64;
    while args.count.is_none_or(|count| printed < count) {
        let message = match source.receive_one() {
            Ok(Some(message)) => message,
            Ok(None) => break,
            Err(err) => match classify_recv_error(err) {
                RecvDisposition::Stop => {
                    info!("listen interrupted");
                    break;
                }
                RecvDisposition::Skip(reason) => {
                    warn!(%reason, "skipping unreadable message");
                    continue;
                }
                RecvDisposition::Fatal(err) => return Err(err),
            },
        };

        printed += 1;
        print_message(&message, &args.inbound, printed, format);
    }

    source
        .close()
        .map_err(|err| channel_error("close failed", err))?;
    info!(printed, "listen finished");
    Ok(SUCCESS)
}
