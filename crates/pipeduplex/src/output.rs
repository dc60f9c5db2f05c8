use std::io::{IsTerminal, Write};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct MessageOutput<'a> {
    pipe: String,
    seq: u64,
    size: usize,
    message: &'a str,
    timestamp: String,
}

/// Print one received message. `seq` counts from 1 per pipe.
pub fn print_message(message: &str, pipe: &Path, seq: u64, format: OutputFormat) {
    let mut out = std::io::stdout().lock();
    let _ = out.write_all(render_message(message, pipe, seq, format).as_bytes());
    let _ = out.flush();
}

fn render_message(message: &str, pipe: &Path, seq: u64, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => {
            let out = MessageOutput {
                pipe: pipe.display().to_string(),
                seq,
                size: message.len(),
                message,
                timestamp: now_unix_seconds(),
            };
            let line = serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string());
            format!("{line}\n")
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["SEQ", "PIPE", "SIZE", "MESSAGE"])
                .add_row(vec![
                    seq.to_string(),
                    pipe.display().to_string(),
                    message.len().to_string(),
                    message.to_string(),
                ]);
            format!("{table}\n")
        }
        OutputFormat::Pretty => format!(
            "#{seq} pipe={} size={} message={message}\n",
            pipe.display(),
            message.len()
        ),
        OutputFormat::Raw => format!("{message}\n"),
    }
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
