//! Host and worker threads exchanging ping/pong over two FIFOs.
//!
//! The worker dispatches through a message handler that replies on its own
//! sink; the host drives the exchange through a background receive loop.
//!
//! Run with:
//!   cargo run --example ping-pong

use std::fs;
use std::thread;
use std::time::Duration;

use pipeduplex::channel::{ChannelConfig, DuplexChannel, MessageSink, MessageSource, OpenOrder};
use pipeduplex::transport::{create_fifo, DEFAULT_FIFO_MODE};

const ROUNDS: usize = 5;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let dir = std::env::temp_dir().join(format!("pipeduplex-pingpong-{}", std::process::id()));
    fs::create_dir_all(&dir)?;
    let to_worker = dir.join("to-worker.fifo");
    let to_host = dir.join("to-host.fifo");
    create_fifo(&to_worker, DEFAULT_FIFO_MODE)?;
    create_fifo(&to_host, DEFAULT_FIFO_MODE)?;

    let worker = {
        let (to_worker, to_host) = (to_worker.clone(), to_host.clone());
        thread::spawn(move || -> Result<(), pipeduplex::channel::ChannelError> {
            let mut source = MessageSource::open(&to_worker)?;
            let mut replies = MessageSink::open(&to_host)?;
            source.set_handler(move |message| {
                let reply = message.replacen("ping", "pong", 1);
                if let Err(err) = replies.send(&reply) {
                    eprintln!("worker: reply failed: {err}");
                }
            });
            source.run()?;
            source.close()
        })
    };

    // The worker opens its inbound pipe first, so the host opens its outbound pipe first.
    let config = ChannelConfig {
        open_order: OpenOrder::WriterFirst,
        ..ChannelConfig::default()
    };
    let channel = DuplexChannel::open_with_config(&to_host, &to_worker, config)?;
    let (source, mut sink) = channel.into_parts();
    let replies = source.spawn()?;

    for round in 0..ROUNDS {
        sink.send(&format!("ping {round}"))?;
        match replies.recv_timeout(Duration::from_secs(1)) {
            Some(reply) => println!("{reply}"),
            None => eprintln!("host: no reply for round {round}"),
        }
    }

    sink.close()?;
    worker.join().map_err(|_| "worker thread panicked")??;
    replies.join()?;

    let _ = fs::remove_dir_all(&dir);
    Ok(())
}
