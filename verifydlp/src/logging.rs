//! Tracing subscriber setup

use crate::config::LoggingConfig;
use tracing_subscriber::{fmt, EnvFilter};

/// Install the global fmt subscriber
///
/// `RUST_LOG` wins when set; otherwise `debug_logging` picks between `debug`
/// and `info`. Returns `false` if a subscriber was already installed.
pub fn init_logging(config: &LoggingConfig) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(config)));

    let installed = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok();

    if installed {
        tracing::debug!("Logging initialized");
    }
    installed
}

fn default_directive(config: &LoggingConfig) -> &'static str {
    if config.debug_logging {
        "debug"
    } else {
        "info"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directive() {
        assert_eq!(default_directive(&LoggingConfig::default()), "info");
        assert_eq!(
            default_directive(&LoggingConfig {
                debug_logging: true
            }),
            "debug"
        );
    }

    #[test]
    fn test_second_init_is_harmless() {
        let config = LoggingConfig::default();
        init_logging(&config);
        assert!(!init_logging(&config));
    }
}
