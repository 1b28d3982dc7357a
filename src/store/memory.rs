//! In-memory mapping store.
//!
//! # Responsibilities
//! - Hold mapping rules in a concurrent map keyed by id
//! - Assign increasing ids so newer rules win ties
//! - Evaluate candidate filters natively (switchable, to exercise both
//!   matcher code paths)

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use dashmap::DashMap;

use crate::mapping::matcher::{is_candidate, sort_by_precedence};
use crate::mapping::rule::{Destination, MappingId, MappingRule, NewMapping};
use crate::store::{MappingFilter, MappingStore, StoreResult};

/// A thread-safe mapping store backed by `DashMap`.
#[derive(Debug)]
pub struct InMemoryMappingStore {
    rules: DashMap<MappingId, MappingRule>,
    next_id: AtomicU64,
    pattern_filter: bool,
    queries: AtomicUsize,
}

impl InMemoryMappingStore {
    /// Create an empty store that evaluates candidate filters itself.
    pub fn new() -> Self {
        Self {
            rules: DashMap::new(),
            next_id: AtomicU64::new(1),
            pattern_filter: true,
            queries: AtomicUsize::new(0),
        }
    }

    /// Create an empty store that only answers unfiltered queries, leaving
    /// pattern evaluation to the matcher.
    pub fn without_pattern_filter() -> Self {
        Self {
            pattern_filter: false,
            ..Self::new()
        }
    }

    /// Create a store holding `seeds`, in order.
    pub fn with_mappings(seeds: impl IntoIterator<Item = NewMapping>) -> StoreResult<Self> {
        let store = Self::new();
        for seed in seeds {
            store.create(seed)?;
        }
        Ok(store)
    }

    /// Insert a rule as-is, keeping its id and skipping validation.
    ///
    /// Used when importing rules written elsewhere; later `create` calls
    /// still receive ids above every imported one.
    pub fn insert_unchecked(&self, rule: MappingRule) {
        self.next_id.fetch_max(rule.id.0 + 1, Ordering::SeqCst);
        self.rules.insert(rule.id, rule);
    }

    /// Number of stored rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Number of `query` calls served so far.
    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::Relaxed)
    }

    fn selects(&self, filter: &MappingFilter, rule: &MappingRule) -> bool {
        match filter {
            MappingFilter::All => true,
            MappingFilter::Candidates { path } => is_candidate(rule, path),
            MappingFilter::Id(id) => rule.id == *id,
            MappingFilter::DestinationPage(page_id) => {
                rule.destination == Destination::Page(*page_id)
            }
            MappingFilter::PatternAndPage { pattern, page_id } => {
                rule.pattern == *pattern && rule.destination == Destination::Page(*page_id)
            }
        }
    }
}

impl Default for InMemoryMappingStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MappingStore for InMemoryMappingStore {
    fn query(&self, filter: &MappingFilter) -> StoreResult<Vec<MappingRule>> {
        self.queries.fetch_add(1, Ordering::Relaxed);

        let unfiltered = MappingFilter::All;
        let filter = match filter {
            MappingFilter::Candidates { .. } if !self.pattern_filter => &unfiltered,
            other => other,
        };

        let mut rules: Vec<MappingRule> = self
            .rules
            .iter()
            .filter(|entry| self.selects(filter, entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        sort_by_precedence(&mut rules);
        Ok(rules)
    }

    fn create(&self, new: NewMapping) -> StoreResult<MappingRule> {
        new.validate()?;
        let id = MappingId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let rule = MappingRule::from_new(id, new.normalized());

        tracing::debug!(mapping_id = %id, pattern = %rule.pattern, "Mapping created");
        self.rules.insert(id, rule.clone());
        Ok(rule)
    }

    fn delete(&self, filter: &MappingFilter) -> StoreResult<usize> {
        let doomed: Vec<MappingId> = self
            .rules
            .iter()
            .filter(|entry| self.selects(filter, entry.value()))
            .map(|entry| *entry.key())
            .collect();

        let removed = doomed
            .iter()
            .filter(|id| self.rules.remove(id).is_some())
            .count();
        if removed > 0 {
            tracing::debug!(removed, filter = ?filter, "Mappings deleted");
        }
        Ok(removed)
    }

    fn supports_pattern_filter(&self) -> bool {
        self.pattern_filter
    }
}
