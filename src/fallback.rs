//! Fallback redirects for paths that match neither a page nor a mapping.
//!
//! # Responsibilities
//! - Walk the request path segment by segment through the page tree
//! - Track the most specific fallback rule inherited along the way
//! - Turn the rule into a destination once the walk hits a missing node
//!
//! # Design Decisions
//! - Rules are sticky: a page's rule applies to everything below it until
//!   a deeper page overrides it
//! - Only a genuinely missing node triggers a fallback; a path naming an
//!   existing page never does
//! - The walk is bounded by the number of segments in the request

use serde::Serialize;

use crate::pages::{
    path_segments, visible, FallbackPolicy, FallbackRule, PageDirectory, Stage, ROOT_PAGE_ID,
};

/// Status used when a fallback rule has no response code.
pub const DEFAULT_FALLBACK_STATUS: u16 = 301;

/// A synthesized redirect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FallbackRedirect {
    pub destination: String,
    pub status: u16,
}

/// Computes fallback redirects against a page directory.
pub struct FallbackResolver<'a> {
    pages: &'a dyn PageDirectory,
    site_policy: Option<&'a FallbackPolicy>,
    site_root: &'a str,
    min_segments: usize,
}

impl<'a> FallbackResolver<'a> {
    pub fn new(
        pages: &'a dyn PageDirectory,
        site_policy: Option<&'a FallbackPolicy>,
        site_root: &'a str,
        min_segments: usize,
    ) -> Self {
        Self {
            pages,
            site_policy,
            site_root,
            min_segments,
        }
    }

    /// Fallback destination for `path`, if a rule applies to its missing node.
    pub fn resolve_fallback(&self, path: &str, stage: Stage) -> Option<FallbackRedirect> {
        let segments = path_segments(path);
        if segments.is_empty() || segments.len() < self.min_segments {
            return None;
        }

        let mut rule = FallbackRule::None;
        let mut specific_url = String::new();
        let mut status = DEFAULT_FALLBACK_STATUS;
        if let Some(policy) = self.site_policy {
            rule = policy.rule;
            specific_url = policy.url.clone();
            status = policy.response_code;
        }
        let mut this_page = self.site_root.to_string();
        let mut nearest_parent = self.site_root.to_string();

        let mut parent_id = ROOT_PAGE_ID;
        let mut missing = None;
        for segment in &segments {
            let found = self
                .pages
                .find_by_segment_and_parent(segment, parent_id)
                .filter(|page| visible(self.pages, page, stage));

            let Some(page) = found else {
                missing = Some(segment.as_str());
                break;
            };

            nearest_parent = page.link.clone();
            if let Some(policy) = page.fallback.as_ref().filter(|p| p.rule != FallbackRule::None) {
                rule = policy.rule;
                specific_url = policy.url.clone();
                this_page = page.link.clone();
                status = policy.response_code;
            }
            parent_id = page.id;
        }

        let missing = missing?;

        let destination = match rule {
            FallbackRule::None => return None,
            FallbackRule::FixedUrl => specific_url,
            FallbackRule::ThisPage => this_page,
            FallbackRule::NearestParent => nearest_parent,
        };
        if destination.is_empty() {
            return None;
        }

        let status = if status == 0 { DEFAULT_FALLBACK_STATUS } else { status };
        tracing::debug!(
            path = %path,
            missing_segment = %missing,
            rule = ?rule,
            destination = %destination,
            status,
            "Fallback rule applied"
        );
        Some(FallbackRedirect {
            destination,
            status,
        })
    }
}
