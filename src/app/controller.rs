//! Application controller and coordination layer
//!
//! `NotesApp` lives on the UI context and owns everything the window needs:
//! the broadcast channel, the ticker that feeds it, the queue marshaled note
//! work arrives on, and the host holding the live notes.

use tracing::{debug, info};

use crate::app::broadcast::BroadcastChannel;
use crate::app::dispatch::{UiDispatcher, UiQueue, Waker, ui_channel};
use crate::app::host::{NoteHost, TickOutcome};
use crate::app::state::TickerState;
use crate::app::ticker::{Ticker, TickerError};
use crate::config::{ConfigError, NotesConfig};
use crate::domain::core::{Point, Rect};
use crate::domain::note::NoteId;

/// Application errors that can occur during controller operations
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Ticker error: {0}")]
    Ticker(#[from] TickerError),

    #[cfg(windows)]
    #[error("Window error: {0}")]
    Window(#[from] crate::platform::window::WindowError),
}

/// Summary of one drain of the UI queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PumpReport {
    /// Marshaled ticks processed
    pub processed: usize,
    /// Notes that moved and stayed visible
    pub moved: usize,
    /// Notes that left the window and were detached
    pub exited: usize,
    /// Ticks that arrived for notes already gone
    pub detached: usize,
}

impl PumpReport {
    /// True if the set of live notes changed
    pub fn notes_changed(&self) -> bool {
        self.exited > 0
    }
}

pub struct NotesApp {
    config: NotesConfig,
    channel: BroadcastChannel,
    ticker: Ticker,
    dispatcher: UiDispatcher,
    queue: UiQueue,
    host: NoteHost,
}

impl NotesApp {
    /// Creates a controller whose queue is drained by polling `pump`
    ///
    /// # Arguments
    /// * `config` - Tick period, step, note size and initial window size
    ///
    /// # Errors
    /// `AppError::Config` if the configuration does not validate
    pub fn new(config: NotesConfig) -> Result<Self, AppError> {
        Self::build(config, None)
    }

    /// Creates a controller that calls `waker` whenever note work is posted
    ///
    /// # Arguments
    /// * `config` - Tick period, step, note size and initial window size
    /// * `waker` - Called from the ticker thread after each post; must only
    ///   nudge the UI event loop, never touch note state
    ///
    /// # Errors
    /// `AppError::Config` if the configuration does not validate
    pub fn with_waker(config: NotesConfig, waker: Waker) -> Result<Self, AppError> {
        Self::build(config, Some(waker))
    }

    fn build(config: NotesConfig, waker: Option<Waker>) -> Result<Self, AppError> {
        config.validate()?;

        let (dispatcher, queue) = ui_channel(waker);
        let host = NoteHost::new(config.client_rect(), config.step(), config.note_size);

        Ok(Self {
            ticker: Ticker::new(config.tick_period()),
            channel: BroadcastChannel::new(),
            config,
            dispatcher,
            queue,
            host,
        })
    }

    /// Starts the background ticker
    ///
    /// # Errors
    /// `AppError::Ticker` if the ticker is already running, was shut down,
    /// or its thread could not be spawned
    pub fn start(&mut self) -> Result<(), AppError> {
        self.ticker.start(self.channel.clone())?;
        info!(
            period_ms = self.config.tick_period_ms,
            width = self.config.window_width,
            height = self.config.window_height,
            "falling notes started"
        );
        Ok(())
    }

    /// Click hook: create a note at `at`
    ///
    /// # Arguments
    /// * `at` - Client-area position of the note's anchor
    ///
    /// # Returns
    /// Identifier of the new note, already subscribed to ticks
    pub fn spawn_note(&mut self, at: Point) -> NoteId {
        self.host.spawn_note(at, &self.channel, &self.dispatcher)
    }

    /// Drains marshaled note work; must run on the UI context
    ///
    /// # Returns
    /// Counts of moved, exited and already-detached notes for this drain
    pub fn pump(&mut self) -> PumpReport {
        let mut report = PumpReport::default();

        while let Some(work) = self.queue.try_next() {
            report.processed += 1;
            match self.host.handle_tick(work) {
                TickOutcome::Moved(_) => report.moved += 1,
                TickOutcome::Exited(_) => report.exited += 1,
                TickOutcome::Detached => report.detached += 1,
            }
        }

        report
    }

    /// The host window's client area changed
    ///
    /// # Arguments
    /// * `bounds` - New client rectangle; notes are tested against it on
    ///   their next tick
    pub fn set_bounds(&mut self, bounds: Rect) {
        debug!(width = bounds.w, height = bounds.h, "bounds changed");
        self.host.set_bounds(bounds);
    }

    /// Window title text
    pub fn caption(&self) -> String {
        self.host.caption()
    }

    pub fn host(&self) -> &NoteHost {
        &self.host
    }

    pub fn channel(&self) -> &BroadcastChannel {
        &self.channel
    }

    pub fn config(&self) -> &NotesConfig {
        &self.config
    }

    pub fn ticker_state(&self) -> TickerState {
        self.ticker.state()
    }

    pub fn ticks_delivered(&self) -> u64 {
        self.ticker.ticks_delivered()
    }

    /// Stops the ticker, runs work already queued, then detaches the host.
    ///
    /// No tick is delivered once this returns. Safe to call repeatedly.
    ///
    /// # Returns
    /// What the final drain processed; an empty report on repeat calls
    ///
    /// # Errors
    /// `AppError::Ticker` if the ticker thread could not be joined
    pub fn shutdown(&mut self) -> Result<PumpReport, AppError> {
        if self.ticker.state().is_cancelled() && self.host.bounds_rectangle().is_none() {
            return Ok(PumpReport::default());
        }

        self.ticker.stop()?;
        let report = self.pump();
        let detached = self.host.detach_all();
        info!(
            ticks = self.ticker.ticks_delivered(),
            detached,
            "falling notes shut down"
        );
        Ok(report)
    }
}

impl Drop for NotesApp {
    fn drop(&mut self) {
        let _ = self.shutdown();
    }
}
