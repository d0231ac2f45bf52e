//! Tracing initialization.

use std::sync::Once;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

static INIT: Once = Once::new();

/// Install the global subscriber.
///
/// Reads `TRIAGE_LOG` for per-module levels, e.g.
/// `TRIAGE_LOG=triage_core::anomaly=debug,triage_core=info`, falling back to
/// `triage_core=info`. Output goes to stderr so stdout stays machine-readable.
/// Safe to call more than once.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env("TRIAGE_LOG")
            .unwrap_or_else(|_| EnvFilter::new("triage_core=info,triage=info"));

        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_line_number(true),
            )
            .with(filter)
            .init();
    });
}
