//! Best-match lookup of a mapping for a URL.
//!
//! # Responsibilities
//! - Collect candidate rules for the request path
//! - Order them deterministically
//! - Apply stage filtering and query-string equality
//!
//! # Design Decisions
//! - Candidates sort by pattern descending, so a literal rule carrying a
//!   query string is tried before the bare path rule
//! - Ties fall to priority, then to the newest id
//! - Query strings compare as unordered maps (`a=1&b=2` == `b=2&a=1`)
//! - A broken rule (bad regex, dangling page) is skipped, never fatal

use std::cmp::Ordering;

use serde::Serialize;

use crate::mapping::error::{ResolveError, ResolveResult};
use crate::mapping::normalize::{normalize, parse_query, split_url};
use crate::mapping::pattern::matches_path;
use crate::mapping::rule::{Destination, MappingRule};
use crate::observability::metrics;
use crate::pages::{PageDirectory, Stage};
use crate::store::{MappingFilter, MappingStore};

/// A rule together with the exact canonical URL it matched.
///
/// Regex destinations are computed from `matched_url`, so it travels with
/// the rule instead of being stored on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchedMapping {
    pub rule: MappingRule,
    pub matched_url: String,
}

/// Precedence between two candidate rules: higher sorts first.
pub fn precedence(a: &MappingRule, b: &MappingRule) -> Ordering {
    b.pattern
        .cmp(&a.pattern)
        .then_with(|| b.priority.cmp(&a.priority))
        .then_with(|| b.id.cmp(&a.id))
}

/// Sort rules highest precedence first.
pub fn sort_by_precedence(rules: &mut [MappingRule]) {
    rules.sort_by(precedence);
}

/// Whether `rule` is a candidate for the canonical `path`.
///
/// A rule whose pattern cannot be evaluated is logged and excluded.
pub fn is_candidate(rule: &MappingRule, path: &str) -> bool {
    match matches_path(rule, path) {
        Ok(matched) => matched,
        Err(e) => {
            tracing::warn!(mapping_id = %rule.id, error = %e, "Skipping mapping with invalid pattern");
            metrics::record_error(e.kind());
            false
        }
    }
}

/// Finds the best mapping for a URL.
#[derive(Clone, Copy)]
pub struct MappingMatcher<'a> {
    store: &'a dyn MappingStore,
    pages: &'a dyn PageDirectory,
}

impl<'a> MappingMatcher<'a> {
    pub fn new(store: &'a dyn MappingStore, pages: &'a dyn PageDirectory) -> Self {
        Self { store, pages }
    }

    /// Return the highest-precedence mapping that applies to `url` in `stage`.
    pub fn find_mapping(&self, url: &str, stage: Stage) -> ResolveResult<Option<MatchedMapping>> {
        let canonical = normalize(url);
        let (path, query) = split_url(&canonical);
        let request_params = query.map(parse_query).unwrap_or_default();

        for rule in self.candidates(path)? {
            if !self.stage_admits(&rule, stage) {
                continue;
            }

            let query_matches = match rule.pattern_query() {
                None => true,
                Some(pattern_query) => parse_query(pattern_query) == request_params,
            };

            if query_matches {
                tracing::debug!(
                    url = %canonical,
                    mapping_id = %rule.id,
                    pattern = %rule.pattern,
                    "Mapping matched"
                );
                return Ok(Some(MatchedMapping {
                    rule,
                    matched_url: canonical,
                }));
            }
        }

        Ok(None)
    }

    /// Candidate rules for `path`, highest precedence first.
    fn candidates(&self, path: &str) -> ResolveResult<Vec<MappingRule>> {
        let mut rules = if self.store.supports_pattern_filter() {
            self.store.query(&MappingFilter::Candidates {
                path: path.to_string(),
            })?
        } else {
            self.store
                .query(&MappingFilter::All)?
                .into_iter()
                .filter(|rule| is_candidate(rule, path))
                .collect()
        };
        sort_by_precedence(&mut rules);
        Ok(rules)
    }

    /// Page-reference rules require a page that exists; one whose page is
    /// only on the draft stage applies to draft requests alone.
    fn stage_admits(&self, rule: &MappingRule, stage: Stage) -> bool {
        let Destination::Page(page_id) = rule.destination else {
            return true;
        };

        if self.pages.page(page_id).is_none() {
            let err = ResolveError::AmbiguousDestination { page_id };
            tracing::warn!(mapping_id = %rule.id, error = %err, "Skipping mapping with dangling page reference");
            metrics::record_error(err.kind());
            return false;
        }

        stage == Stage::Draft || self.pages.is_published(page_id)
    }
}
