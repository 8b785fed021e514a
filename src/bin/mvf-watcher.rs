use std::process::ExitCode;

use log::{error, info};

use mvf::core::{WatcherArgs, setup_logging};
use mvf::watcher::{self, WatcherConfig};

fn main() -> ExitCode {
    setup_logging();
    let args = WatcherArgs::parse_relion(
        std::env::args_os().map(|arg| arg.to_string_lossy().into_owned()),
    );
    info!(args = args; "mvf-watcher started");

    let config = WatcherConfig::from(&args);
    let result = watcher::run(&config);
    if let Err(e) = watcher::record_exit(&config.output_path(), result.is_ok()) {
        error!("cannot write exit sentinel: {e}");
        return ExitCode::FAILURE;
    }

    match result {
        Ok(report) => {
            info!(
                "{} micrographs in {}",
                report.total,
                config.output_path().display()
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("watcher failed: {e}");
            ExitCode::FAILURE
        }
    }
}
