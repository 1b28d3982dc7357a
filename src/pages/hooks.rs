//! Automatic mapping maintenance for page changes.
//!
//! # Responsibilities
//! - Map a renamed or moved page's former URL to the page
//! - Map every descendant's former URL too, since their links moved with it
//! - Drop mappings to pages that were removed from every stage
//!
//! # Design Decisions
//! - Descendants are walked with an explicit queue, not recursion
//! - Existing `(pattern, page)` mappings are never duplicated
//! - Generated mappings get priority 1 so hand-written ones at the same
//!   pattern can still outrank them

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use crate::mapping::normalize::normalize;
use crate::mapping::rule::{Destination, MappingRule, NewMapping};
use crate::pages::{PageDirectory, PageId};
use crate::store::{MappingFilter, MappingStore, StoreResult};

/// Priority of mappings created from page history.
pub const GENERATED_MAPPING_PRIORITY: i32 = 1;

/// Create a page-reference mapping from `pattern` unless one already exists.
pub(crate) fn map_former_link(
    store: &dyn MappingStore,
    pattern: &str,
    page_id: PageId,
) -> StoreResult<Option<MappingRule>> {
    let pattern = normalize(pattern);
    if pattern.is_empty() {
        return Ok(None);
    }

    let existing = store.query(&MappingFilter::PatternAndPage {
        pattern: pattern.clone(),
        page_id,
    })?;
    if !existing.is_empty() {
        return Ok(None);
    }

    let rule = store.create(
        NewMapping::literal(pattern, Destination::Page(page_id))
            .with_priority(GENERATED_MAPPING_PRIORITY),
    )?;
    Ok(Some(rule))
}

/// Reacts to page hierarchy changes by maintaining mappings.
pub struct PageHooks {
    store: Arc<dyn MappingStore>,
    pages: Arc<dyn PageDirectory>,
    auto_map_renames: bool,
}

impl PageHooks {
    pub fn new(
        store: Arc<dyn MappingStore>,
        pages: Arc<dyn PageDirectory>,
        auto_map_renames: bool,
    ) -> Self {
        Self {
            store,
            pages,
            auto_map_renames,
        }
    }

    /// The page's URL changed from `old_link` (rename or move). Returns the
    /// mappings created.
    pub fn on_page_moved(&self, page_id: PageId, old_link: &str) -> StoreResult<Vec<MappingRule>> {
        if !self.auto_map_renames {
            return Ok(Vec::new());
        }
        let Some(new_link) = self.pages.link(page_id) else {
            tracing::debug!(page_id, "Moved page no longer resolves, nothing to map");
            return Ok(Vec::new());
        };
        if normalize(&new_link) == normalize(old_link) {
            return Ok(Vec::new());
        }

        let mut created = Vec::new();
        let mut visited = HashSet::new();
        let mut queue = VecDeque::from([(page_id, normalize(old_link))]);

        while let Some((id, former)) = queue.pop_front() {
            if !visited.insert(id) {
                continue;
            }
            if let Some(rule) = map_former_link(self.store.as_ref(), &former, id)? {
                created.push(rule);
            }
            for child in self.pages.children(id) {
                queue.push_back((child.id, format!("{former}/{}", child.segment)));
            }
        }

        tracing::info!(
            page_id,
            old_link = %old_link,
            new_link = %new_link,
            created = created.len(),
            "Mapped former page URLs"
        );
        Ok(created)
    }

    /// The page was deleted somewhere. Once it is gone from every stage its
    /// mappings are removed; returns how many.
    pub fn on_page_removed(&self, page_id: PageId) -> StoreResult<usize> {
        if !self.pages.is_fully_deleted(page_id) {
            return Ok(0);
        }
        let removed = self.store.delete(&MappingFilter::DestinationPage(page_id))?;
        if removed > 0 {
            tracing::info!(page_id, removed, "Removed mappings to deleted page");
        }
        Ok(removed)
    }
}
