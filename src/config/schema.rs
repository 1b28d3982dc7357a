//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the service.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::mapping::chain::DEFAULT_MAX_HOPS;
use crate::mapping::rule::NewMapping;
use crate::pages::memory::PageSeed;
use crate::pages::FallbackPolicy;

/// Root configuration for the link mapping service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct SiteConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Mapping and fallback resolution behaviour.
    pub resolution: ResolutionConfig,

    /// Site-wide fallback rule, inherited by every page without its own.
    pub fallback: Option<FallbackPolicy>,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Admin API settings.
    pub admin: AdminConfig,

    /// Pages loaded into the in-memory directory at startup.
    pub pages: Vec<PageSeed>,

    /// Mappings loaded into the in-memory store at startup.
    pub mappings: Vec<NewMapping>,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Resolution behaviour shared by every request.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ResolutionConfig {
    /// Maximum chain re-resolutions before a mapping is abandoned.
    pub max_hops: u32,

    /// Run fallback resolution for every response, not only 404s.
    pub replace_default: bool,

    /// Paths with fewer segments never trigger a fallback.
    pub min_fallback_segments: usize,

    /// Create mappings automatically when pages are renamed or moved.
    pub auto_map_renames: bool,

    /// Link of the site root, the seed for `ThisPage`/`NearestParent`.
    pub site_root: String,
}

impl Default for ResolutionConfig {
    fn default() -> Self {
        Self {
            max_hops: DEFAULT_MAX_HOPS,
            replace_default: false,
            min_fallback_segments: 1,
            auto_map_renames: true,
            site_root: "/".to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable admin routes.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,
}

/// Placeholder key rejected by validation when the admin API is enabled.
pub const PLACEHOLDER_API_KEY: &str = "CHANGE_ME_IN_PRODUCTION";

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: PLACEHOLDER_API_KEY.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::rule::Destination;
    use crate::pages::FallbackRule;

    #[test]
    fn test_defaults() {
        let config = SiteConfig::default();
        assert_eq!(config.resolution.max_hops, 10);
        assert_eq!(config.resolution.min_fallback_segments, 1);
        assert!(!config.resolution.replace_default);
        assert!(config.fallback.is_none());
        assert!(!config.admin.enabled);
    }

    #[test]
    fn test_parse_full_file() {
        let config: SiteConfig = toml::from_str(
            r#"
            [listener]
            bind_address = "127.0.0.1:9000"

            [resolution]
            max_hops = 5
            min_fallback_segments = 2

            [fallback]
            rule = "nearest_parent"
            response_code = 302

            [[pages]]
            id = 1
            segment = "about"

            [[pages]]
            id = 2
            parent_id = 1
            segment = "team"
            published = false
            fallback = { rule = "fixed_url", url = "/contact" }

            [[mappings]]
            pattern = "/old-about"
            destination = { page = 1 }
            status_code = 301
            forward_post_body = true

            [[mappings]]
            pattern = "^news/(.*)$"
            pattern_type = "regex"
            destination = { link = "blog/$1" }
            "#,
        )
        .unwrap();

        assert_eq!(config.listener.bind_address, "127.0.0.1:9000");
        assert_eq!(config.resolution.max_hops, 5);
        assert!(config.resolution.auto_map_renames);
        let fallback = config.fallback.unwrap();
        assert_eq!(fallback.rule, FallbackRule::NearestParent);
        assert_eq!(fallback.response_code, 302);
        assert_eq!(config.pages.len(), 2);
        assert!(config.pages[0].published);
        assert!(!config.pages[1].published);
        assert_eq!(
            config.pages[1].fallback.as_ref().map(|f| f.url.as_str()),
            Some("/contact")
        );
        assert_eq!(config.mappings[0].destination, Destination::Page(1));
        assert!(config.mappings[0].forward_post_body);
        assert_eq!(config.mappings[1].destination, Destination::Link("blog/$1".into()));
    }
}
