use tracing_subscriber::{fmt, EnvFilter};

/// Initializes the global tracing subscriber. The filter comes from
/// `RUST_LOG` when set, otherwise from the configured level. Safe to call
/// once per process; subsequent calls are ignored.
pub fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level));

    let _ = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
