//! Fixed-period background ticker
//!
//! A dedicated thread sleeps for the period and then delivers one tick to
//! the broadcast channel, synchronously, before sleeping again. A slow
//! delivery delays the next tick instead of overlapping it, so at most one
//! delivery is ever in flight. The shutdown flag is checked on both sides of
//! the sleep so a stop requested mid-sleep never produces an extra tick.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, info, trace};

use crate::app::broadcast::{BroadcastChannel, Tick};
use crate::app::state::{StateMachine, TickerEvent, TickerState};

/// Ticker lifecycle errors
#[derive(Debug, thiserror::Error)]
pub enum TickerError {
    #[error("Ticker already running")]
    AlreadyRunning,

    #[error("Ticker was cancelled and cannot be restarted")]
    Cancelled,

    #[error("Failed to spawn ticker thread: {0}")]
    SpawnFailed(#[from] std::io::Error),

    #[error("Thread join failed")]
    ThreadJoinFailed,
}

pub struct Ticker {
    period: Duration,
    state: TickerState,

    // Thread handle for the tick loop
    thread_handle: Option<JoinHandle<()>>,

    // Atomic flag to signal thread shutdown
    shutdown: Arc<AtomicBool>,

    // Sequence number of the last delivered tick
    last_tick: Arc<AtomicU64>,
}

impl Ticker {
    /// Create a new ticker (not yet started)
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            state: TickerState::Idle,
            thread_handle: None,
            shutdown: Arc::new(AtomicBool::new(false)),
            last_tick: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Start delivering ticks to `channel` from a background thread
    ///
    /// # Arguments
    /// * `channel` - Channel whose subscribers receive every tick
    ///
    /// # Errors
    /// `AlreadyRunning` or `Cancelled` from the state machine, or
    /// `SpawnFailed` if the thread could not be created
    pub fn start(&mut self, channel: BroadcastChannel) -> Result<(), TickerError> {
        let next = StateMachine::process_event(self.state, TickerEvent::Start)?;

        let period = self.period;
        let shutdown = Arc::clone(&self.shutdown);
        let last_tick = Arc::clone(&self.last_tick);

        let handle = thread::Builder::new()
            .name("falling-notes-ticker".to_string())
            .spawn(move || Self::tick_loop(period, shutdown, last_tick, channel))?;

        self.thread_handle = Some(handle);
        self.state = next;
        info!(period_ms = self.period.as_millis() as u64, "ticker started");

        Ok(())
    }

    /// Request cancellation and wait for the loop to exit.
    ///
    /// A delivery already in progress finishes first; none starts afterwards.
    /// Safe to call any number of times.
    ///
    /// # Errors
    /// `ThreadJoinFailed` if the tick loop panicked
    pub fn stop(&mut self) -> Result<(), TickerError> {
        self.state = StateMachine::process_event(self.state, TickerEvent::Stop)?;
        self.shutdown.store(true, Ordering::Release);

        if let Some(handle) = self.thread_handle.take() {
            handle.join().map_err(|_| TickerError::ThreadJoinFailed)?;
            info!(ticks = self.ticks_delivered(), "ticker stopped");
        }

        Ok(())
    }

    pub fn state(&self) -> TickerState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state.is_running() && self.thread_handle.is_some()
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Number of ticks delivered so far
    pub fn ticks_delivered(&self) -> u64 {
        self.last_tick.load(Ordering::Acquire)
    }

    fn tick_loop(period: Duration, shutdown: Arc<AtomicBool>, last_tick: Arc<AtomicU64>, channel: BroadcastChannel) {
        let mut sequence = 0u64;

        loop {
            if shutdown.load(Ordering::Acquire) {
                break;
            }
            thread::sleep(period);
            if shutdown.load(Ordering::Acquire) {
                break;
            }

            sequence += 1;
            let report = channel.deliver(Tick::new(sequence));
            last_tick.store(sequence, Ordering::Release);
            trace!(
                tick = sequence,
                invoked = report.invoked,
                failed = report.failed,
                panicked = report.panicked,
                "tick delivered"
            );
        }

        debug!(ticks = sequence, "tick loop exited");
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        // Ensure clean shutdown
        let _ = self.stop();
    }
}
