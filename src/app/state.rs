//! Ticker lifecycle state machine
//!
//! `Idle -> Running -> Cancelled`, with `Cancelled` terminal. A ticker
//! that was never started can still be cancelled.

use crate::app::ticker::TickerError;

/// Lifecycle state of the ticker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TickerState {
    /// Created but not started
    #[default]
    Idle,
    /// Background loop is delivering ticks
    Running,
    /// Cancellation requested; never runs again
    Cancelled,
}

impl TickerState {
    pub fn is_running(&self) -> bool {
        matches!(self, TickerState::Running)
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, TickerState::Cancelled)
    }
}

/// Lifecycle events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickerEvent {
    Start,
    Stop,
}

/// State machine for ticker transitions
pub struct StateMachine;

impl StateMachine {
    /// Processes a lifecycle event and returns the new state
    ///
    /// # Errors
    /// Starting a running ticker, or any ticker that has been cancelled.
    pub fn process_event(current_state: TickerState, event: TickerEvent) -> Result<TickerState, TickerError> {
        match (current_state, event) {
            (TickerState::Idle, TickerEvent::Start) => Ok(TickerState::Running),
            (TickerState::Running, TickerEvent::Start) => Err(TickerError::AlreadyRunning),
            (TickerState::Cancelled, TickerEvent::Start) => Err(TickerError::Cancelled),

            // Stopping is idempotent
            (_, TickerEvent::Stop) => Ok(TickerState::Cancelled),
        }
    }
}
