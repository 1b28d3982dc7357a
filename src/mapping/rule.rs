//! Mapping rule types.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::mapping::normalize::{normalize, split_url};
use crate::mapping::pattern::compile_full_match;
use crate::mapping::status::resolve_status;
use crate::pages::PageId;

/// Unique identifier of a stored mapping. Larger ids are newer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MappingId(pub u64);

impl std::fmt::Display for MappingId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How a mapping's pattern is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternType {
    /// Literal path, optionally followed by a query string.
    #[default]
    Literal,
    /// Regular expression matched against the whole path.
    Regex,
}

/// Where a mapping redirects to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Destination {
    /// A page in the site hierarchy; its current link is the target.
    Page(PageId),
    /// An external or site-relative link. For regex mappings this may
    /// contain back-references into the matched URL.
    Link(String),
}

/// A stored redirect rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingRule {
    pub id: MappingId,
    pub pattern: String,
    pub pattern_type: PatternType,
    pub priority: i32,
    pub destination: Destination,
    /// Configured 3xx code; `0` means unset.
    pub status_code: u16,
    pub forward_post_body: bool,
}

impl MappingRule {
    /// Build a stored rule from its write model.
    pub fn from_new(id: MappingId, new: NewMapping) -> Self {
        Self {
            id,
            pattern: new.pattern,
            pattern_type: new.pattern_type,
            priority: new.priority,
            destination: new.destination,
            status_code: new.status_code,
            forward_post_body: new.forward_post_body,
        }
    }

    /// Path component of the pattern (everything before `?`).
    pub fn pattern_path(&self) -> &str {
        split_url(&self.pattern).0
    }

    /// Query component of a literal pattern, if it has one.
    ///
    /// Regex patterns never carry a query component of their own.
    pub fn pattern_query(&self) -> Option<&str> {
        match self.pattern_type {
            PatternType::Literal => split_url(&self.pattern).1,
            PatternType::Regex => None,
        }
    }

    /// Destination page id, for page-reference mappings.
    pub fn destination_page(&self) -> Option<PageId> {
        match self.destination {
            Destination::Page(id) => Some(id),
            Destination::Link(_) => None,
        }
    }

    /// Final HTTP status for a redirect through this rule.
    pub fn status(&self) -> u16 {
        resolve_status(self)
    }
}

/// Validation failures for a mapping write.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidMapping {
    #[error("pattern must not be empty")]
    EmptyPattern,

    #[error("invalid regular expression {pattern:?}: {reason}")]
    InvalidRegex { pattern: String, reason: String },

    #[error("destination link must not be empty")]
    EmptyDestination,

    #[error("status code {0} is not a redirect (3xx) code")]
    NotRedirectStatus(u16),

    #[error("external URL validation failed for {0:?}")]
    InvalidExternalUrl(String),
}

/// Write model for creating a mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMapping {
    pub pattern: String,
    #[serde(default)]
    pub pattern_type: PatternType,
    #[serde(default)]
    pub priority: i32,
    pub destination: Destination,
    #[serde(default)]
    pub status_code: u16,
    #[serde(default)]
    pub forward_post_body: bool,
    /// Require a link destination to be an absolute external URL.
    #[serde(default, skip_serializing)]
    pub validate_external_url: bool,
}

impl NewMapping {
    /// A literal mapping with default priority and status.
    pub fn literal(pattern: impl Into<String>, destination: Destination) -> Self {
        Self {
            pattern: pattern.into(),
            pattern_type: PatternType::Literal,
            priority: 0,
            destination,
            status_code: 0,
            forward_post_body: false,
            validate_external_url: false,
        }
    }

    /// A regex mapping with default priority and status.
    pub fn regex(pattern: impl Into<String>, destination: Destination) -> Self {
        Self {
            pattern_type: PatternType::Regex,
            ..Self::literal(pattern, destination)
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_status(mut self, status_code: u16, forward_post_body: bool) -> Self {
        self.status_code = status_code;
        self.forward_post_body = forward_post_body;
        self
    }

    /// Canonicalize the pattern and destination the way they are stored.
    ///
    /// Literal patterns are normalized. Regex patterns are kept verbatim,
    /// since case folding or trimming would change what they match.
    /// Relative links are normalized; absolute URLs are left untouched.
    pub fn normalized(mut self) -> Self {
        if self.pattern_type == PatternType::Literal {
            self.pattern = normalize(&self.pattern);
        }
        if let Destination::Link(link) = &self.destination {
            if !is_absolute_url(link) {
                self.destination = Destination::Link(normalize(link));
            }
        }
        self
    }

    /// Semantic checks applied before a mapping is stored.
    pub fn validate(&self) -> Result<(), InvalidMapping> {
        if self.pattern.trim().is_empty() {
            return Err(InvalidMapping::EmptyPattern);
        }
        if self.pattern_type == PatternType::Regex {
            compile_full_match(&self.pattern).map_err(|e| InvalidMapping::InvalidRegex {
                pattern: self.pattern.clone(),
                reason: e.to_string(),
            })?;
        }
        if self.status_code != 0 && !(300..400).contains(&self.status_code) {
            return Err(InvalidMapping::NotRedirectStatus(self.status_code));
        }
        if let Destination::Link(link) = &self.destination {
            if link.trim().is_empty() {
                return Err(InvalidMapping::EmptyDestination);
            }
            if self.validate_external_url && !is_valid_external_url(link) {
                return Err(InvalidMapping::InvalidExternalUrl(link.clone()));
            }
        }
        Ok(())
    }
}

/// Whether a link carries its own scheme (`https://...`).
pub fn is_absolute_url(link: &str) -> bool {
    link.contains("://")
}

fn is_valid_external_url(link: &str) -> bool {
    match url::Url::parse(link.trim()) {
        Ok(parsed) => {
            matches!(parsed.scheme(), "http" | "https" | "ftp")
                && parsed.host_str().is_some_and(|h| !h.is_empty())
        }
        Err(_) => false,
    }
}
