//! Marshaling from the ticker thread onto the UI context
//!
//! Note callbacks run on the ticker thread and must not touch note state.
//! They post a [`NoteTick`] through a [`UiDispatcher`] and return at once;
//! the UI context drains the matching [`UiQueue`] in FIFO order, which keeps
//! the ticks of a single note in delivery order.

use std::fmt;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};

use crate::app::broadcast::{Tick, TickError};
use crate::domain::note::NoteId;

/// Unit of work marshaled to the UI context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoteTick {
    pub note: NoteId,
    pub tick: Tick,
}

/// Nudges the UI event loop after work was posted
pub type Waker = Arc<dyn Fn() + Send + Sync>;

/// Sending half, cloned into every note callback
#[derive(Clone)]
pub struct UiDispatcher {
    sender: Sender<NoteTick>,
    waker: Option<Waker>,
}

impl UiDispatcher {
    /// Enqueue work without waiting for it to run
    pub fn post(&self, work: NoteTick) -> Result<(), TickError> {
        self.sender.send(work).map_err(|_| TickError::QueueClosed)?;
        if let Some(waker) = &self.waker {
            waker();
        }
        Ok(())
    }
}

impl fmt::Debug for UiDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UiDispatcher")
            .field("has_waker", &self.waker.is_some())
            .finish()
    }
}

/// Receiving half, owned by the UI context
#[derive(Debug)]
pub struct UiQueue {
    receiver: Receiver<NoteTick>,
}

impl UiQueue {
    /// Next pending unit of work, if any
    pub fn try_next(&self) -> Option<NoteTick> {
        match self.receiver.try_recv() {
            Ok(work) => Some(work),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }
}

/// Create a connected dispatcher/queue pair
pub fn ui_channel(waker: Option<Waker>) -> (UiDispatcher, UiQueue) {
    let (sender, receiver) = mpsc::channel();
    (UiDispatcher { sender, waker }, UiQueue { receiver })
}
