//! Falling notes: a fixed-rate background ticker broadcasting to a changing
//! set of notes that live on the UI thread.
//!
//! Layers, bottom up:
//! - [`domain`]: geometry and the note entity
//! - [`app`]: broadcast channel, ticker, UI queue, host and controller
//! - [`ui`]: tiny-skia rendering of the host
//! - `platform`: the Win32 window (Windows only)

pub mod app;
pub mod config;
pub mod domain;
pub mod logging;
#[cfg(windows)]
pub mod platform;
pub mod ui;

pub use app::broadcast::{BroadcastChannel, DeliveryReport, Subscription, SubscriptionId, Tick, TickError};
pub use app::controller::{AppError, NotesApp, PumpReport};
pub use app::host::{NoteHost, TickOutcome};
pub use app::ticker::{Ticker, TickerError};
pub use config::NotesConfig;
pub use domain::core::{Offset, Point, Rect};
pub use domain::note::{Note, NoteId};
