//! In-memory page directory with draft and live stages.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::pages::{FallbackPolicy, PageDirectory, PageId, PageNode, ROOT_PAGE_ID};

/// A page definition as written in configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSeed {
    pub id: PageId,
    #[serde(default)]
    pub parent_id: PageId,
    pub segment: String,
    #[serde(default = "default_published")]
    pub published: bool,
    #[serde(default)]
    pub fallback: Option<FallbackPolicy>,
}

fn default_published() -> bool {
    true
}

#[derive(Debug, Clone)]
struct PageRecord {
    parent_id: PageId,
    segment: String,
    fallback: Option<FallbackPolicy>,
    on_draft: bool,
    on_live: bool,
}

impl PageRecord {
    fn exists(&self) -> bool {
        self.on_draft || self.on_live
    }
}

/// A thread-safe page tree backed by `DashMap`.
#[derive(Debug)]
pub struct InMemoryPageDirectory {
    pages: DashMap<PageId, PageRecord>,
    next_id: AtomicU64,
}

impl InMemoryPageDirectory {
    pub fn new() -> Self {
        Self {
            pages: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Build a directory from configured pages.
    pub fn with_pages(seeds: impl IntoIterator<Item = PageSeed>) -> Self {
        let directory = Self::new();
        for seed in seeds {
            directory.insert(seed);
        }
        directory
    }

    /// Insert a page with an explicit id. Draft always holds the page.
    pub fn insert(&self, seed: PageSeed) {
        self.next_id.fetch_max(seed.id + 1, Ordering::SeqCst);
        self.pages.insert(
            seed.id,
            PageRecord {
                parent_id: seed.parent_id,
                segment: seed.segment.to_lowercase(),
                fallback: seed.fallback,
                on_draft: true,
                on_live: seed.published,
            },
        );
    }

    /// Add a page under `parent_id`, returning its new id.
    pub fn add_page(&self, parent_id: PageId, segment: &str, published: bool) -> PageId {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.insert(PageSeed {
            id,
            parent_id,
            segment: segment.to_string(),
            published,
            fallback: None,
        });
        id
    }

    pub fn set_fallback(&self, id: PageId, fallback: Option<FallbackPolicy>) {
        if let Some(mut record) = self.pages.get_mut(&id) {
            record.fallback = fallback;
        }
    }

    pub fn publish(&self, id: PageId) {
        if let Some(mut record) = self.pages.get_mut(&id) {
            record.on_live = true;
        }
    }

    /// Remove the page from the live stage only.
    pub fn unpublish(&self, id: PageId) {
        if let Some(mut record) = self.pages.get_mut(&id) {
            record.on_live = false;
        }
    }

    /// Remove the page from every stage.
    pub fn delete(&self, id: PageId) {
        if let Some(mut record) = self.pages.get_mut(&id) {
            record.on_draft = false;
            record.on_live = false;
        }
    }

    /// Change the page's segment, returning its link from before the change.
    pub fn rename(&self, id: PageId, segment: &str) -> Option<String> {
        let old_link = self.link(id)?;
        let mut record = self.pages.get_mut(&id)?;
        record.segment = segment.to_lowercase();
        Some(old_link)
    }

    /// Move the page under a new parent, returning its link from before the move.
    pub fn move_page(&self, id: PageId, parent_id: PageId) -> Option<String> {
        let old_link = self.link(id)?;
        let mut record = self.pages.get_mut(&id)?;
        record.parent_id = parent_id;
        Some(old_link)
    }

    fn node(&self, id: PageId, record: &PageRecord) -> Option<PageNode> {
        Some(PageNode {
            id,
            parent_id: record.parent_id,
            segment: record.segment.clone(),
            link: self.build_link(id)?,
            fallback: record.fallback.clone(),
        })
    }

    /// Join the segments from the root down to `id`.
    ///
    /// `None` when an ancestor is missing or the parent chain loops.
    fn build_link(&self, id: PageId) -> Option<String> {
        let mut segments = Vec::new();
        let mut current = id;
        while current != ROOT_PAGE_ID {
            if segments.len() > self.pages.len() {
                return None;
            }
            let (parent_id, segment) = {
                let record = self.pages.get(&current)?;
                if !record.exists() {
                    return None;
                }
                (record.parent_id, record.segment.clone())
            };
            segments.push(segment);
            current = parent_id;
        }
        segments.reverse();
        Some(format!("/{}", segments.join("/")))
    }

    fn snapshot(&self) -> Vec<(PageId, PageRecord)> {
        let mut records: Vec<(PageId, PageRecord)> = self
            .pages
            .iter()
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect();
        records.sort_by_key(|(id, _)| *id);
        records
    }
}

impl Default for InMemoryPageDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl PageDirectory for InMemoryPageDirectory {
    fn find_by_segment_and_parent(&self, segment: &str, parent_id: PageId) -> Option<PageNode> {
        // Lowest id wins when siblings share a segment.
        let (id, record) = self
            .pages
            .iter()
            .filter(|entry| {
                let record = entry.value();
                record.exists()
                    && record.parent_id == parent_id
                    && record.segment.eq_ignore_ascii_case(segment)
            })
            .map(|entry| (*entry.key(), entry.value().clone()))
            .min_by_key(|(id, _)| *id)?;
        self.node(id, &record)
    }

    fn page(&self, id: PageId) -> Option<PageNode> {
        let record = self.pages.get(&id)?.value().clone();
        if !record.exists() {
            return None;
        }
        self.node(id, &record)
    }

    fn is_published(&self, id: PageId) -> bool {
        self.pages.get(&id).is_some_and(|record| record.on_live)
    }

    fn is_fully_deleted(&self, id: PageId) -> bool {
        self.pages.get(&id).map_or(true, |record| !record.exists())
    }

    fn children(&self, id: PageId) -> Vec<PageNode> {
        self.snapshot()
            .into_iter()
            .filter(|(_, record)| record.exists() && record.parent_id == id)
            .filter_map(|(child, record)| self.node(child, &record))
            .collect()
    }
}
