//! Process-wide log subscriber.

use crate::config::{LogConfig, LogFormat};
use tracing::debug;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info";

/// Install the global `tracing` subscriber. `RUST_LOG` overrides the default
/// `info` filter. Returns `false` when a global subscriber was already set, in
/// which case that subscriber stays in place.
pub fn init_logging(config: &LogConfig) -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let result = match config.format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    match result {
        Ok(()) => true,
        Err(err) => {
            debug!(error = %err, "log subscriber already installed, keeping it");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_keeps_first_subscriber() {
        let config = LogConfig::default();
        init_logging(&config);
        assert!(!init_logging(&LogConfig {
            format: LogFormat::Json,
        }));
    }
}
