//! Backfill mappings from published page version history.
//!
//! # Responsibilities
//! - Replay published versions in order to reconstruct every URL a page
//!   has had
//! - Recompute descendant URLs whenever a page's segment or parent changes
//! - Create a mapping from each former URL to its page
//!
//! # Design Decisions
//! - Replay state is a plain map rebuilt per run; nothing is persisted
//! - URLs that are some page's current link, or whose page no longer
//!   exists, are not mapped
//! - A URL claimed by several pages maps to the one that held it last

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

use serde::{Deserialize, Serialize};

use crate::mapping::normalize::normalize;
use crate::mapping::rule::MappingRule;
use crate::pages::hooks::map_former_link;
use crate::pages::{PageDirectory, PageId, ROOT_PAGE_ID};
use crate::store::{MappingStore, StoreResult};

/// One published version of a page, in version-table order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionRecord {
    pub record_id: PageId,
    pub parent_id: PageId,
    pub segment: String,
    pub version: u32,
}

/// Outcome of a history replay.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HistoryReport {
    /// Distinct URLs reconstructed from the history.
    pub collected: usize,
    /// Mappings created.
    pub created: Vec<MappingRule>,
    /// URLs left unmapped (current link, missing page, or already mapped).
    pub skipped: usize,
}

#[derive(Debug, Clone)]
struct ReplayRow {
    parent_id: PageId,
    segment: String,
}

/// Replay state: the latest published version of each page seen so far.
#[derive(Debug, Default)]
struct Replay {
    rows: HashMap<PageId, ReplayRow>,
}

impl Replay {
    /// Apply a version; true when it changed the page's URL (or is new).
    fn apply(&mut self, record: &VersionRecord) -> bool {
        let changed = match self.rows.get(&record.record_id) {
            Some(row) => row.segment != record.segment || row.parent_id != record.parent_id,
            None => true,
        };
        self.rows.insert(
            record.record_id,
            ReplayRow {
                parent_id: record.parent_id,
                segment: record.segment.clone(),
            },
        );
        changed
    }

    /// URL of `id` under the replayed tree; `None` if an ancestor is missing.
    fn url_for(&self, id: PageId) -> Option<String> {
        let mut segments = Vec::new();
        let mut current = id;
        while current != ROOT_PAGE_ID {
            if segments.len() > self.rows.len() {
                return None;
            }
            let row = self.rows.get(&current)?;
            segments.push(row.segment.as_str());
            current = row.parent_id;
        }
        segments.reverse();
        Some(normalize(&segments.join("/")))
    }

    fn children(&self, id: PageId) -> Vec<PageId> {
        let mut children: Vec<PageId> = self
            .rows
            .iter()
            .filter(|(_, row)| row.parent_id == id)
            .map(|(child, _)| *child)
            .collect();
        children.sort_unstable();
        children
    }
}

/// Reconstruct former URLs from `records` and map them to their pages.
pub fn replay_history(
    records: &[VersionRecord],
    store: &dyn MappingStore,
    pages: &dyn PageDirectory,
) -> StoreResult<HistoryReport> {
    let mut replay = Replay::default();
    let mut urls: BTreeMap<String, PageId> = BTreeMap::new();

    for record in records {
        let changed = replay.apply(record);
        if let Some(url) = replay.url_for(record.record_id) {
            urls.insert(url, record.record_id);
        }
        if !changed {
            continue;
        }

        let mut seen = HashSet::from([record.record_id]);
        let mut queue: VecDeque<PageId> = replay.children(record.record_id).into();
        while let Some(id) = queue.pop_front() {
            if !seen.insert(id) {
                continue;
            }
            if let Some(url) = replay.url_for(id) {
                urls.insert(url, id);
            }
            queue.extend(replay.children(id));
        }
    }

    let current_links: HashSet<String> = urls
        .values()
        .filter_map(|id| pages.link(*id))
        .map(|link| normalize(&link))
        .collect();

    let mut report = HistoryReport {
        collected: urls.len(),
        ..HistoryReport::default()
    };
    for (url, page_id) in urls {
        if url.is_empty() || current_links.contains(&url) || pages.page(page_id).is_none() {
            report.skipped += 1;
            continue;
        }
        match map_former_link(store, &url, page_id)? {
            Some(rule) => report.created.push(rule),
            None => report.skipped += 1,
        }
    }

    tracing::info!(
        collected = report.collected,
        created = report.created.len(),
        skipped = report.skipped,
        "Historical mapping replay complete"
    );
    Ok(report)
}
