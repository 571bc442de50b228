use std::process::ExitCode;

use nutriscan::{boot, cli};

#[tokio::main]
async fn main() -> ExitCode {
    boot::init_common();
    let matches = cli::parse_args();

    if let Err(err) = cli::cleanup::install_interrupt_handler() {
        log::warn!("Ctrl-C handler not installed: {err:#}");
    }

    match cli::actions::run(&matches).await {
        Ok(code) => code,
        Err(err) => {
            log::debug!("Command failed: {err:?}");
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
