//! Global log setup.
//!
//! Every line carries a UTC timestamp (`YYYY-MM-DD HH:MM:SS UTC`) and the
//! emitting module path as the subsystem tag. `RUST_LOG` overrides the
//! default `info` level.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::ChronoUtc;

pub fn init() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_timer(ChronoUtc::new("%Y-%m-%d %H:%M:%S UTC".to_string()))
        .with_target(true)
        .with_ansi(false)
        .try_init();
}
