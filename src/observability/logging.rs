//! Structured logging.
//!
//! # Design Decisions
//! - Uses the tracing crate for structured logging
//! - `RUST_LOG` wins; otherwise the configured level applies to this
//!   crate and to tower-http's request traces

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::schema::ObservabilityConfig;

/// Filter directive derived from the configured log level.
pub fn default_directive(config: &ObservabilityConfig) -> String {
    format!(
        "link_mapping={level},tower_http={level}",
        level = config.log_level
    )
}

/// Install the global tracing subscriber.
///
/// Safe to call more than once; later calls leave the first subscriber in
/// place.
pub fn init_logging(config: &ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(config)));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directive() {
        let config = ObservabilityConfig {
            log_level: "warn".into(),
            ..ObservabilityConfig::default()
        };
        assert_eq!(default_directive(&config), "link_mapping=warn,tower_http=warn");
    }

    #[test]
    fn test_init_twice() {
        init_logging(&ObservabilityConfig::default());
        init_logging(&ObservabilityConfig::default());
    }
}
