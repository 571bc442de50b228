use chrono::Local;
use log::LevelFilter;
use std::io::{self, Write};

use env_logger::{Builder, Target};

pub const LOG_FILE_ENV: &str = "NUTRISCAN_LOG_FILE";

/// Logger setup shared by the binary and embedders.
///
/// `RUST_LOG` filters as usual. With `NUTRISCAN_LOG_FILE` set, records are
/// appended to that file instead of stderr.
pub fn init_common() {
    match std::env::var(LOG_FILE_ENV).ok().filter(|path| !path.is_empty()) {
        Some(path) => {
            if let Err(err) = init_file_logger(&path) {
                eprintln!("Failed to initialize file logger at '{path}': {err}");
                init_stderr_logger();
            }
        }
        None => init_stderr_logger(),
    }
}

fn init_stderr_logger() {
    let _ = Builder::new()
        .filter_level(LevelFilter::Warn)
        .parse_default_env()
        .format_timestamp(None)
        .try_init();
}

fn init_file_logger(path: &str) -> io::Result<()> {
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;

    let mut builder = Builder::new();
    builder
        .format(|buf, record| {
            writeln!(
                buf,
                "{}:{} {} [{}] - {}",
                record.file().unwrap_or("unknown"),
                record.line().unwrap_or(0),
                Local::now().format("%Y-%m-%dT%H:%M:%S%.3f"),
                record.level(),
                record.args()
            )
        })
        .target(Target::Pipe(Box::new(file)))
        .filter_level(LevelFilter::Debug)
        .parse_default_env();

    if builder.try_init().is_err() {
        return Err(io::Error::other("a logger is already installed"));
    }

    log::info!("File logger initialized at {path}");
    Ok(())
}
