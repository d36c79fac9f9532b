//! Tracing subscriber initialisation.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install a test writer subscriber, ignoring the error when one is
/// already set by another test in the same binary.
pub fn try_init_for_tests() {
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "debug".to_string());

    let _ = tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_test_writer())
        .with(EnvFilter::new(filter))
        .try_init();
}
