//! Minimal worker: creates a request/reply FIFO pair and echoes every
//! request back in upper case until the client closes its end.
//!
//! Run with:
//!   cargo run --example echo-worker
//!
//! In another terminal (paths are printed on startup):
//!   cargo run --features cli -- send <DIR>/requests.fifo \
//!     --data hello --wait --reply <DIR>/replies.fifo

use std::fs;

use pipeduplex::channel::DuplexChannel;
use pipeduplex::transport::{create_fifo, DEFAULT_FIFO_MODE};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let dir = std::env::temp_dir().join(format!("pipeduplex-echo-{}", std::process::id()));
    fs::create_dir_all(&dir)?;
    let requests = dir.join("requests.fifo");
    let replies = dir.join("replies.fifo");
    create_fifo(&requests, DEFAULT_FIFO_MODE)?;
    create_fifo(&replies, DEFAULT_FIFO_MODE)?;

    eprintln!("Requests: {}", requests.display());
    eprintln!("Replies:  {}", replies.display());

    // Blocks until a client opens both pipes.
    let mut channel = DuplexChannel::open(&requests, &replies)?;
    eprintln!("Client connected");

    channel.serve(|request, replies| {
        eprintln!("Received {} bytes", request.len());
        replies.send(&request.to_uppercase())
    })?;
    eprintln!("Client closed its end");

    channel.close()?;
    let _ = fs::remove_dir_all(&dir);
    Ok(())
}
