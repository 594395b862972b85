//! Window-less session
//!
//! Runs the full ticker -> channel -> queue -> host pipeline without a
//! window: notes are seeded along the top edge and the UI context is a
//! polling loop on the calling thread. Used on platforms without the Win32
//! host.

use std::thread;
use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::app::controller::{AppError, NotesApp};
use crate::config::NotesConfig;
use crate::domain::core::Point;

pub const SEED_NOTES: usize = 8;

const MIN_SESSION_TIMEOUT: Duration = Duration::from_secs(2);

/// Result of a headless run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSummary {
    pub spawned: usize,
    pub exited: usize,
    /// Notes still live when the session gave up waiting
    pub remaining: usize,
    pub ticks: u64,
}

/// Spawns `notes` notes across the top edge and pumps until all have fallen out
pub fn run_session(config: NotesConfig, notes: usize) -> Result<SessionSummary, AppError> {
    let mut app = NotesApp::new(config)?;
    let bounds = app.config().client_rect();
    let deadline = Instant::now().checked_add(session_timeout(app.config()));

    for i in 0..notes {
        let x = bounds.x + bounds.w * (i as i32 + 1) / (notes as i32 + 1);
        app.spawn_note(Point::new(x, bounds.y));
    }
    info!(caption = %app.caption(), "seeded notes");

    app.start()?;

    let poll = app.config().tick_period() / 2;
    let mut exited = 0;
    while !app.host().is_empty() && deadline.is_none_or(|deadline| Instant::now() < deadline) {
        thread::sleep(poll);
        let report = app.pump();
        if report.notes_changed() {
            exited += report.exited;
            info!(caption = %app.caption(), "notes left the window");
        }
    }

    let remaining = app.host().len();
    if remaining > 0 {
        warn!(remaining, "session timed out with notes still falling");
    }

    app.shutdown()?;
    Ok(SessionSummary {
        spawned: notes,
        exited,
        remaining,
        ticks: app.ticks_delivered(),
    })
}

/// Generous upper bound on how long seeded notes need to fall out
fn session_timeout(config: &NotesConfig) -> Duration {
    let rect = config.client_rect();
    let ticks_to_cross = |extent: i32, step: i32| match step.unsigned_abs() {
        0 => u32::MAX,
        step => (extent.max(0).unsigned_abs() / step).saturating_add(1),
    };
    let ticks = ticks_to_cross(rect.h, config.step_y)
        .min(ticks_to_cross(rect.w, config.step_x))
        .max(1);

    config
        .tick_period()
        .checked_mul(ticks.saturating_mul(2).saturating_add(10))
        .unwrap_or(Duration::MAX)
        .max(MIN_SESSION_TIMEOUT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_scales_with_window() {
        // 49 ticks to exit at the defaults, doubled plus slack
        assert_eq!(session_timeout(&NotesConfig::default()), Duration::from_millis(10_800));

        let tiny = NotesConfig {
            tick_period_ms: 1,
            window_height: 20,
            ..NotesConfig::default()
        };
        assert_eq!(session_timeout(&tiny), MIN_SESSION_TIMEOUT);
    }

    #[test]
    fn timeout_never_overflows() {
        let extreme = NotesConfig {
            tick_period_ms: u64::MAX,
            step_x: 0,
            step_y: i32::MIN,
            window_width: i32::MAX,
            window_height: i32::MAX,
            ..NotesConfig::default()
        };
        assert_eq!(session_timeout(&extreme), Duration::from_millis(u64::MAX) * 12);

        let slow_crawl = NotesConfig {
            tick_period_ms: u64::MAX,
            step_y: 1,
            window_height: i32::MAX,
            ..NotesConfig::default()
        };
        assert_eq!(session_timeout(&slow_crawl), Duration::MAX);
    }

    #[test]
    fn session_runs_until_all_notes_fall_out() {
        let config = NotesConfig {
            tick_period_ms: 2,
            window_width: 100,
            window_height: 50,
            ..NotesConfig::default()
        };

        let summary = run_session(config, 3).unwrap();
        assert_eq!(summary.spawned, 3);
        assert_eq!(summary.exited, 3);
        assert_eq!(summary.remaining, 0);
        assert!(summary.ticks >= 5);
    }
}
