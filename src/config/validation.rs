//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check referential integrity (pages reference existing parents)
//! - Validate value ranges (hop limit, timeouts, redirect codes)
//! - Validate seeded mappings with the same rules the store applies
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: SiteConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::{SiteConfig, PLACEHOLDER_API_KEY};
use crate::mapping::rule::InvalidMapping;
use crate::pages::{FallbackPolicy, FallbackRule, PageId, ROOT_PAGE_ID};

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener.bind_address {0:?} is not a socket address")]
    BindAddress(String),

    #[error("observability.metrics_address {0:?} is not a socket address")]
    MetricsAddress(String),

    #[error("timeouts.request_secs must be greater than zero")]
    ZeroTimeout,

    #[error("resolution.max_hops must be at least 1")]
    ZeroMaxHops,

    #[error("{context}: response code {code} is not a redirect (3xx) code")]
    FallbackStatus { context: String, code: u16 },

    #[error("{context}: fixed_url rule requires a url")]
    FallbackUrlMissing { context: String },

    #[error("admin.api_key must be set when the admin API is enabled")]
    AdminKey,

    #[error("page {0} uses reserved id 0")]
    RootPageId(PageId),

    #[error("page id {0} is defined more than once")]
    DuplicatePage(PageId),

    #[error("page {0} has an empty segment")]
    EmptySegment(PageId),

    #[error("page {page} references unknown parent {parent}")]
    UnknownParent { page: PageId, parent: PageId },

    #[error("mapping #{index}: {source}")]
    Mapping {
        index: usize,
        #[source]
        source: InvalidMapping,
    },
}

fn check_policy(context: &str, policy: &FallbackPolicy, errors: &mut Vec<ValidationError>) {
    if policy.response_code != 0 && !(300..400).contains(&policy.response_code) {
        errors.push(ValidationError::FallbackStatus {
            context: context.to_string(),
            code: policy.response_code,
        });
    }
    if policy.rule == FallbackRule::FixedUrl && policy.url.trim().is_empty() {
        errors.push(ValidationError::FallbackUrlMissing {
            context: context.to_string(),
        });
    }
}

/// Check a parsed configuration, collecting every problem found.
pub fn validate_config(config: &SiteConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.listener.bind_address.clone()));
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroTimeout);
    }
    if config.resolution.max_hops == 0 {
        errors.push(ValidationError::ZeroMaxHops);
    }
    if let Some(policy) = &config.fallback {
        check_policy("fallback", policy, &mut errors);
    }
    if config.admin.enabled
        && (config.admin.api_key.trim().is_empty() || config.admin.api_key == PLACEHOLDER_API_KEY)
    {
        errors.push(ValidationError::AdminKey);
    }

    let mut ids = HashSet::new();
    for page in &config.pages {
        if page.id == ROOT_PAGE_ID {
            errors.push(ValidationError::RootPageId(page.id));
        }
        if !ids.insert(page.id) {
            errors.push(ValidationError::DuplicatePage(page.id));
        }
        if page.segment.trim().is_empty() {
            errors.push(ValidationError::EmptySegment(page.id));
        }
        if let Some(policy) = &page.fallback {
            check_policy(&format!("page {}", page.id), policy, &mut errors);
        }
    }
    for page in &config.pages {
        if page.parent_id != ROOT_PAGE_ID && !ids.contains(&page.parent_id) {
            errors.push(ValidationError::UnknownParent {
                page: page.id,
                parent: page.parent_id,
            });
        }
    }

    for (index, mapping) in config.mappings.iter().enumerate() {
        if let Err(source) = mapping.validate() {
            errors.push(ValidationError::Mapping { index, source });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
