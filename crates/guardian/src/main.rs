//! Road Guardian - Main Entry Point

use clap::Parser;
use road_guardian::{init_logging, run_session, Cli, Settings};
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(e) = init_logging(cli.verbose, cli.log_format) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    info!("=== Road Guardian v{} ===", env!("CARGO_PKG_VERSION"));

    let settings = match Settings::load(&cli) {
        Ok(settings) => settings,
        Err(e) => {
            error!("{:#}", e);
            return ExitCode::from(2);
        }
    };

    let stop = Arc::new(AtomicBool::new(false));
    let signal_stop = stop.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, shutting down...");
            signal_stop.store(true, Ordering::Relaxed);
        }
    });

    let result = tokio::task::spawn_blocking(move || run_session(&settings, stop)).await;
    match result {
        Ok(Ok(summary)) => {
            info!(
                frames = summary.frames,
                faces_skipped = summary.faces_skipped,
                alarms = summary.alarms,
                notifications = summary.notifications,
                "Session finished"
            );
            ExitCode::SUCCESS
        }
        Ok(Err(e)) => {
            error!("{}", e);
            ExitCode::from(e.exit_code())
        }
        Err(e) => {
            error!("Session task failed: {}", e);
            ExitCode::FAILURE
        }
    }
}
