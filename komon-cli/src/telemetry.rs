//! Logging setup for the `komon` binary.

use std::sync::Once;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

static INIT: Once = Once::new();

/// Installs a console subscriber filtered by `RUST_LOG` (default `default_level`).
/// Later calls are no-ops.
pub fn init_telemetry(service_name: &str, default_level: &str) {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_level));

        let installed = tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_line_number(true)
                    .with_writer(std::io::stderr),
            )
            .try_init();

        if installed.is_ok() {
            tracing::debug!(service.name = service_name, "telemetry initialized");
        }
    });
}
