use std::fs;

use pipeduplex_channel::{ChannelConfig, DuplexChannel, MessageSink, OpenOrder};
use pipeduplex_frame::FrameConfig;
use serde_json::Value;
use tracing::debug;

use crate::cmd::{install_ctrlc_handler, SendArgs};
use crate::exit::{channel_error, io_error, CliError, CliResult, FAILURE, SUCCESS, USAGE};
use crate::output::{print_message, OutputFormat};

/// A resolved outbound payload.
#[derive(Debug)]
enum Payload {
    Text(Vec<String>),
    Json(Value),
}

pub fn run(args: SendArgs, format: OutputFormat, frame: FrameConfig) -> CliResult<i32> {
    let payload = resolve_payload(&args)?;

    let Some(reply) = args.reply.as_ref().filter(|_| args.wait) else {
        let mut sink = MessageSink::open_with_config(&args.outbound, frame)
            .map_err(|err| channel_error("open failed", err))?;
        send_payload(&mut sink, &payload)?;
        sink.close()
            .map_err(|err| channel_error("close failed", err))?;
        return Ok(SUCCESS);
    };

    // The responder opens its inbound pipe first, so open ours for writing first.
    let config = ChannelConfig {
        frame,
        open_order: OpenOrder::WriterFirst,
    };
    let mut channel = DuplexChannel::open_with_config(reply, &args.outbound, config)
        .map_err(|err| channel_error("open failed", err))?;
    install_ctrlc_handler(channel.shutdown_handle())?;
    send_payload(channel.sink_mut(), &payload)?;

    let response = channel
        .receive_one()
        .map_err(|err| channel_error("receive failed", err))?;
    channel
        .close()
        .map_err(|err| channel_error("close failed", err))?;

    match response {
        Some(message) => {
            print_message(&message, reply, 1, format);
            Ok(SUCCESS)
        }
        None => Err(CliError::new(
            FAILURE,
            "peer closed the reply pipe without answering",
        )),
    }
}

fn send_payload(sink: &mut MessageSink, payload: &Payload) -> CliResult<()> {
    match payload {
        Payload::Json(value) => sink
            .send_json(value)
            .map_err(|err| channel_error("send failed", err)),
        Payload::Text(lines) => {
            for line in lines {
                sink.send(line)
                    .map_err(|err| channel_error("send failed", err))?;
            }
            debug!(messages = lines.len(), "payload sent");
            Ok(())
        }
    }
}

fn resolve_payload(args: &SendArgs) -> CliResult<Payload> {
    if let Some(json) = &args.json {
        let value = serde_json::from_str(json)
            .map_err(|err| CliError::new(USAGE, format!("--json is not valid JSON: {err}")))?;
        return Ok(Payload::Json(value));
    }
    if let Some(data) = &args.data {
        return Ok(Payload::Text(vec![data.clone()]));
    }
    if let Some(path) = &args.file {
        let text = fs::read_to_string(path)
            .map_err(|err| io_error(&format!("failed reading {}", path.display()), err))?;
        return Ok(Payload::Text(split_lines(&text)));
    }
    Err(CliError::new(USAGE, "one of --data, --json or --file is required"))
}

/// Split file contents into messages. A final newline does not start an
/// extra empty message; `\r` is kept as content.
fn split_lines(text: &str) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }
    let body = text.strip_suffix('\n').unwrap_or(text);
    body.split('\n').map(str::to_owned).collect()
}
