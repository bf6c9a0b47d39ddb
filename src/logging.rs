//! Logging setup on top of `tracing-subscriber`.
//!
//! `RUST_LOG` selects the filter (default `info`), e.g.
//! `RUST_LOG=inventory_analytics=debug`.

use tracing_subscriber::{fmt, EnvFilter};

pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_line_number(true)
        .init();
}

/// Verbose subscriber routed through the test harness; safe to call repeatedly
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}
