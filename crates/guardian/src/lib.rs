//! Road Guardian
//!
//! Live driver drowsiness and yawn monitoring: reads frames from a source,
//! runs the DMS state machine on each, and reports alerts through the
//! console and an optional annotated-frame recorder.

pub mod cli;
pub mod presenter;
pub mod settings;
mod session;

pub use cli::{Cli, LogFormat};
pub use presenter::{overlay_for, ConsolePresenter, FrameRecorder, OverlayText, Presenter};
pub use session::{run_session, Session, SessionError, SessionSummary};
pub use settings::Settings;

use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Initialize logging
pub fn init_logging(verbose: bool, format: LogFormat) -> anyhow::Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Text => tracing::subscriber::set_global_default(builder.finish())?,
        LogFormat::Json => tracing::subscriber::set_global_default(builder.json().finish())?,
    }
    Ok(())
}
