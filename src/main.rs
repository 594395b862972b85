use std::process::ExitCode;

use falling_notes::logging::init_tracing;
use falling_notes::{AppError, NotesConfig};
use tracing::error;

fn main() -> ExitCode {
    init_tracing();

    let result = NotesConfig::load().map_err(AppError::from).and_then(run);
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "falling-notes failed");
            ExitCode::FAILURE
        }
    }
}

#[cfg(windows)]
fn run(config: NotesConfig) -> Result<(), AppError> {
    falling_notes::platform::window::NotesWindow::create(config)?.run()
}

#[cfg(not(windows))]
fn run(config: NotesConfig) -> Result<(), AppError> {
    use falling_notes::app::headless::{SEED_NOTES, run_session};
    use tracing::info;

    info!("no window host on this platform, running a headless session");
    let summary = run_session(config, SEED_NOTES)?;
    info!(
        spawned = summary.spawned,
        exited = summary.exited,
        remaining = summary.remaining,
        ticks = summary.ticks,
        "session finished"
    );
    Ok(())
}
