use pipeduplex_transport::create_fifo;

use crate::cmd::MkfifoArgs;
use crate::exit::{transport_error, CliResult, SUCCESS};
use crate::output::OutputFormat;

pub fn run(args: MkfifoArgs, format: OutputFormat) -> CliResult<i32> {
    for path in &args.paths {
        create_fifo(path, args.mode)
            .map_err(|err| transport_error(&format!("mkfifo {}", path.display()), err))?;
        match format {
            OutputFormat::Json => println!(
                "{}",
                serde_json::json!({
                    "path": path.display().to_string(),
                    "mode": format!("{:04o}", args.mode),
                })
            ),
            OutputFormat::Table | OutputFormat::Pretty => {
                println!("created {} (mode {:04o})", path.display(), args.mode)
            }
            OutputFormat::Raw => println!("{}", path.display()),
        }
    }
    Ok(SUCCESS)
}
