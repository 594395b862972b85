//! Tracing subscriber setup for the binary

use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

/// Install a fmt subscriber filtered by `RUST_LOG`, defaulting to `info`
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(filter)
        .init();
}
