use std::env;

use tracing_subscriber::EnvFilter;

use crate::config::Config;

/// Initializes the global tracing subscriber.
///
/// The configured level applies to the whole process; a `RUST_LOG` value
/// takes precedence and supports per-module directives.
pub fn init_tracing(config: &Config) {
    let env_filter = match env::var(EnvFilter::DEFAULT_ENV) {
        Ok(value) => EnvFilter::new(value),
        Err(_) => EnvFilter::new(config.logging.level.to_string()),
    };

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();
}
