//! Page hierarchy subsystem.
//!
//! # Data Flow
//! ```text
//! PageDirectory (read-only view of the site tree)
//!     → matcher.rs   (does a mapping's destination page exist / is it live?)
//!     → chain.rs     (page link of a page-reference destination)
//!     → fallback.rs  (segment-by-segment walk for inherited fallback rules)
//!
//! Page changes (rename, move, delete)
//!     → hooks.rs   (create / remove mappings automatically)
//!     → history.rs (backfill mappings from published version history)
//! ```
//!
//! # Design Decisions
//! - Pages are owned by an external collaborator; this crate only reads
//!   them through `PageDirectory`
//! - Page id `0` is the site root and never a real page
//! - Segment comparison is case-insensitive, like the rest of matching

pub mod history;
pub mod hooks;
pub mod memory;

use serde::{Deserialize, Serialize};

use crate::mapping::normalize::{normalize, split_url};

/// Identifier of a page in the hierarchy.
pub type PageId = u64;

/// Parent id of top-level pages.
pub const ROOT_PAGE_ID: PageId = 0;

/// Which version of the site a request reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    #[default]
    Live,
    Draft,
}

impl Stage {
    /// Draft when the query string carries `stage=Stage`, otherwise live.
    pub fn from_query(query: Option<&str>) -> Self {
        let draft = query
            .map(|q| {
                url::form_urlencoded::parse(q.as_bytes())
                    .any(|(k, v)| k.eq_ignore_ascii_case("stage") && v.eq_ignore_ascii_case("stage"))
            })
            .unwrap_or(false);
        if draft {
            Stage::Draft
        } else {
            Stage::Live
        }
    }
}

/// Policy for synthesizing a redirect when a path under a page is missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackRule {
    #[default]
    None,
    /// Redirect to a configured URL.
    FixedUrl,
    /// Redirect to the page that defined the rule.
    ThisPage,
    /// Redirect to the deepest page that exists on the requested path.
    NearestParent,
}

/// A fallback rule with its parameters, set per page or site-wide.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackPolicy {
    pub rule: FallbackRule,
    /// Target for `FixedUrl`.
    pub url: String,
    /// Redirect status; `0` means the default (301).
    pub response_code: u16,
}

/// A node of the site tree as seen by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageNode {
    pub id: PageId,
    pub parent_id: PageId,
    pub segment: String,
    /// Full site-relative URL of the page.
    pub link: String,
    pub fallback: Option<FallbackPolicy>,
}

/// Read access to the page hierarchy.
pub trait PageDirectory: Send + Sync {
    /// The page named `segment` directly under `parent_id`.
    fn find_by_segment_and_parent(&self, segment: &str, parent_id: PageId) -> Option<PageNode>;

    /// The page with this id, if it exists on any stage.
    fn page(&self, id: PageId) -> Option<PageNode>;

    /// Full link of the page.
    fn link(&self, id: PageId) -> Option<String> {
        self.page(id).map(|page| page.link)
    }

    /// Whether the page exists on the live stage.
    fn is_published(&self, id: PageId) -> bool;

    /// Whether the page has been removed from every stage.
    fn is_fully_deleted(&self, id: PageId) -> bool;

    /// Direct children of the page (or of the root, for `ROOT_PAGE_ID`).
    fn children(&self, id: PageId) -> Vec<PageNode>;
}

/// Canonical, non-empty path segments of a URL; the query is dropped.
pub fn path_segments(url: &str) -> Vec<String> {
    let canonical = normalize(url);
    split_url(&canonical)
        .0
        .split('/')
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .collect()
}

/// Whether `stage` can see the page.
pub fn visible(pages: &dyn PageDirectory, page: &PageNode, stage: Stage) -> bool {
    stage == Stage::Draft || pages.is_published(page.id)
}

/// Resolve a full path to the page it names, walking from the root.
///
/// Returns `None` for the root path itself and for any path with a missing
/// or invisible segment.
pub fn find_by_path(pages: &dyn PageDirectory, path: &str, stage: Stage) -> Option<PageNode> {
    let mut parent_id = ROOT_PAGE_ID;
    let mut found = None;
    for segment in path_segments(path) {
        let page = pages
            .find_by_segment_and_parent(&segment, parent_id)
            .filter(|page| visible(pages, page, stage))?;
        parent_id = page.id;
        found = Some(page);
    }
    found
}
