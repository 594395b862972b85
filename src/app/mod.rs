//! Application orchestration layer
//!
//! The ticker thread feeds the broadcast channel; note callbacks marshal
//! their work through the dispatcher onto the UI context, where the host
//! applies it. The controller wires the pieces together.

pub mod broadcast;
pub mod controller;
pub mod dispatch;
pub mod headless;
pub mod host;
pub mod state;
pub mod ticker;
