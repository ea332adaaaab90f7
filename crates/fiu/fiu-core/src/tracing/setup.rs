//! Tracing initialization.

use std::sync::Once;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

static INIT: Once = Once::new();

/// Initialize the tracing/logging system.
///
/// Reads the `FIU_LOG` environment variable for per-module log levels, e.g.
/// `FIU_LOG=fiu_storage::queue=debug,fiu_storage=info`.
///
/// Falls back to `info` for the fiu crates if `FIU_LOG` is not set or is invalid.
/// Calling it more than once is safe.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env("FIU_LOG")
            .unwrap_or_else(|_| EnvFilter::new("fiu_core=info,fiu_storage=info"));

        let _ = tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_names(true)
                    .with_file(true)
                    .with_line_number(true),
            )
            .with(filter)
            .try_init();
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_twice_is_harmless() {
        init_tracing();
        init_tracing();
        ::tracing::info!(target: "fiu_core", "tracing initialized");
    }
}
