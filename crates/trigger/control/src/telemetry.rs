//! Tracing subscriber setup for processes embedding the controller

use crate::config::LoggingConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global tracing subscriber
///
/// `RUST_LOG` wins over the configured level. Fails instead of panicking
/// when a global subscriber is already set.
pub fn init_tracing(
    logging: &LoggingConfig,
) -> Result<(), tracing_subscriber::util::TryInitError> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    if logging.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .try_init()
    }
}
