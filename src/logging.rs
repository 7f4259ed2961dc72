use std::sync::Once;

use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

/// Install a global `tracing` subscriber printing wrapper activity
///
/// Verbosity is controlled through the `RUST_LOG` environment variable, e.g.
/// `RUST_LOG=decorate=debug` reports every timer scheduled, cancelled and
/// fired. Calling this more than once, or after another subscriber has been
/// installed, has no effect.
pub fn init() {
    INIT.call_once(|| {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_span_events(FmtSpan::CLOSE),
            )
            .with(EnvFilter::from_default_env())
            .try_init()
            .unwrap_or(());
    });
}
