//! Redirect chain resolution.
//!
//! # Responsibilities
//! - Follow a mapping's destination through further mappings
//! - Stop at the first destination no mapping claims
//! - Bound the walk so cyclic data cannot hang a request
//! - Produce the full chain for operator diagnostics
//!
//! # Design Decisions
//! - A page destination is final; page links are never re-matched
//! - Exceeding the hop limit is an error the engine swallows, so the
//!   request falls through to not-found handling

use serde::Serialize;

use crate::mapping::error::{ResolveError, ResolveResult};
use crate::mapping::matcher::{MappingMatcher, MatchedMapping};
use crate::mapping::pattern::substitute;
use crate::mapping::rule::{Destination, MappingId, MappingRule, PatternType};
use crate::pages::{PageDirectory, Stage};

/// Default bound on chain re-resolutions.
pub const DEFAULT_MAX_HOPS: u32 = 10;

/// Where a single mapping sends the request.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Step {
    /// A page link; the chain ends here.
    Final(String),
    /// A link that may itself be mapped.
    Continue(String),
}

impl Step {
    fn link(&self) -> &str {
        match self {
            Step::Final(link) | Step::Continue(link) => link,
        }
    }
}

/// One mapping visited while tracing a chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChainHop {
    pub id: MappingId,
    pub pattern: String,
    pub destination: String,
    pub priority: i32,
}

impl ChainHop {
    fn new(rule: &MappingRule, destination: &str) -> Self {
        Self {
            id: rule.id,
            pattern: rule.pattern.clone(),
            destination: destination.to_string(),
            priority: rule.priority,
        }
    }
}

/// How a traced chain ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ChainOutcome {
    Resolved { destination: String },
    TooLong,
    NoMapping,
}

/// Every hop taken from a URL to its final destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChainTrace {
    pub url: String,
    pub hops: Vec<ChainHop>,
    pub outcome: ChainOutcome,
}

/// Follows mapping destinations to a terminal link.
pub struct ChainResolver<'a> {
    matcher: MappingMatcher<'a>,
    pages: &'a dyn PageDirectory,
    max_hops: u32,
}

impl<'a> ChainResolver<'a> {
    pub fn new(matcher: MappingMatcher<'a>, pages: &'a dyn PageDirectory, max_hops: u32) -> Self {
        Self {
            matcher,
            pages,
            max_hops,
        }
    }

    fn step(&self, matched: &MatchedMapping) -> ResolveResult<Step> {
        let rule = &matched.rule;
        match &rule.destination {
            Destination::Page(page_id) => self
                .pages
                .link(*page_id)
                .map(Step::Final)
                .ok_or(ResolveError::AmbiguousDestination { page_id: *page_id }),
            Destination::Link(link) => match rule.pattern_type {
                PatternType::Literal => Ok(Step::Continue(link.clone())),
                PatternType::Regex => substitute(rule, link, &matched.matched_url).map(Step::Continue),
            },
        }
    }

    /// Immediate destination of a matched mapping, without following chains.
    pub fn destination(&self, matched: &MatchedMapping) -> ResolveResult<String> {
        self.step(matched).map(|step| step.link().to_string())
    }

    /// Follow `matched` to the first destination that no mapping claims.
    pub fn resolve_chain(&self, matched: &MatchedMapping, stage: Stage) -> ResolveResult<String> {
        let mut link = match self.step(matched)? {
            Step::Final(link) => return Ok(link),
            Step::Continue(link) => link,
        };

        let mut hops = 1;
        while let Some(next) = self.matcher.find_mapping(&link, stage)? {
            if hops >= self.max_hops {
                tracing::warn!(
                    mapping_id = %matched.rule.id,
                    hops,
                    last_link = %link,
                    "Redirect chain too long, abandoning"
                );
                return Err(ResolveError::ChainTooLong { hops });
            }
            hops += 1;
            link = match self.step(&next)? {
                Step::Final(link) => return Ok(link),
                Step::Continue(link) => link,
            };
        }

        Ok(link)
    }

    /// Diagnostic walk from `url`, recording every mapping visited.
    pub fn trace_chain(&self, url: &str, stage: Stage) -> ResolveResult<ChainTrace> {
        let mut trace = ChainTrace {
            url: url.to_string(),
            hops: Vec::new(),
            outcome: ChainOutcome::NoMapping,
        };

        let Some(mut current) = self.matcher.find_mapping(url, stage)? else {
            return Ok(trace);
        };

        loop {
            let step = self.step(&current)?;
            trace.hops.push(ChainHop::new(&current.rule, step.link()));

            let link = match step {
                Step::Final(link) => {
                    trace.outcome = ChainOutcome::Resolved { destination: link };
                    return Ok(trace);
                }
                Step::Continue(link) => link,
            };

            match self.matcher.find_mapping(&link, stage)? {
                None => {
                    trace.outcome = ChainOutcome::Resolved { destination: link };
                    return Ok(trace);
                }
                Some(_) if trace.hops.len() as u32 >= self.max_hops => {
                    trace.outcome = ChainOutcome::TooLong;
                    return Ok(trace);
                }
                Some(next) => current = next,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::rule::NewMapping;
    use crate::pages::memory::InMemoryPageDirectory;
    use crate::store::{InMemoryMappingStore, MappingStore};

    fn link(to: &str) -> Destination {
        Destination::Link(to.into())
    }

    fn first(store: &InMemoryMappingStore, pages: &InMemoryPageDirectory, url: &str) -> MatchedMapping {
        MappingMatcher::new(store, pages)
            .find_mapping(url, Stage::Live)
            .unwrap()
            .expect("mapping should match")
    }

    #[test]
    fn test_linear_chain_resolves_to_terminal() {
        let store = InMemoryMappingStore::new();
        let pages = InMemoryPageDirectory::new();
        store.create(NewMapping::literal("a", link("b"))).unwrap();
        store.create(NewMapping::literal("b", link("c"))).unwrap();

        let resolver = ChainResolver::new(MappingMatcher::new(&store, &pages), &pages, DEFAULT_MAX_HOPS);
        let matched = first(&store, &pages, "a");
        assert_eq!(resolver.resolve_chain(&matched, Stage::Live).unwrap(), "c");
    }

    #[test]
    fn test_cycle_is_bounded() {
        let store = InMemoryMappingStore::new();
        let pages = InMemoryPageDirectory::new();
        store.create(NewMapping::literal("a", link("b"))).unwrap();
        store.create(NewMapping::literal("b", link("a"))).unwrap();

        let resolver = ChainResolver::new(MappingMatcher::new(&store, &pages), &pages, DEFAULT_MAX_HOPS);
        let matched = first(&store, &pages, "a");
        let queries_before = store.query_count();
        match resolver.resolve_chain(&matched, Stage::Live) {
            Err(ResolveError::ChainTooLong { hops }) => assert_eq!(hops, DEFAULT_MAX_HOPS),
            other => panic!("expected ChainTooLong, got {other:?}"),
        }
        assert_eq!(store.query_count() - queries_before, DEFAULT_MAX_HOPS as usize);
    }

    #[test]
    fn test_chain_of_exactly_limit_minus_one_resolves() {
        let store = InMemoryMappingStore::new();
        let pages = InMemoryPageDirectory::new();
        for i in 0..DEFAULT_MAX_HOPS {
            store
                .create(NewMapping::literal(format!("p{i}"), link(&format!("p{}", i + 1))))
                .unwrap();
        }
        let resolver = ChainResolver::new(MappingMatcher::new(&store, &pages), &pages, DEFAULT_MAX_HOPS);
        let matched = first(&store, &pages, "p0");
        assert_eq!(resolver.resolve_chain(&matched, Stage::Live).unwrap(), "p10");

        store.create(NewMapping::literal("p10", link("p11"))).unwrap();
        assert!(matches!(
            resolver.resolve_chain(&matched, Stage::Live),
            Err(ResolveError::ChainTooLong { .. })
        ));
    }

    #[test]
    fn test_page_destination_terminates() {
        let store = InMemoryMappingStore::new();
        let pages = InMemoryPageDirectory::new();
        let about = pages.add_page(0, "about", true);
        store.create(NewMapping::literal("old-about", Destination::Page(about))).unwrap();
        store.create(NewMapping::literal("about", link("elsewhere"))).unwrap();

        let resolver = ChainResolver::new(MappingMatcher::new(&store, &pages), &pages, DEFAULT_MAX_HOPS);
        let matched = first(&store, &pages, "old-about");
        assert_eq!(resolver.resolve_chain(&matched, Stage::Live).unwrap(), "/about");
    }

    #[test]
    fn test_regex_destination_is_substituted() {
        let store = InMemoryMappingStore::new();
        let pages = InMemoryPageDirectory::new();
        store.create(NewMapping::regex("^old/(.*)$", link("new/$1"))).unwrap();

        let resolver = ChainResolver::new(MappingMatcher::new(&store, &pages), &pages, DEFAULT_MAX_HOPS);
        let matched = first(&store, &pages, "old/page1");
        assert_eq!(resolver.destination(&matched).unwrap(), "new/page1");
        assert_eq!(resolver.resolve_chain(&matched, Stage::Live).unwrap(), "new/page1");
    }

    #[test]
    fn test_trace_chain() {
        let store = InMemoryMappingStore::new();
        let pages = InMemoryPageDirectory::new();
        let a = store.create(NewMapping::literal("a", link("b")).with_priority(3)).unwrap();
        let b = store.create(NewMapping::literal("b", link("c"))).unwrap();
        let resolver = ChainResolver::new(MappingMatcher::new(&store, &pages), &pages, DEFAULT_MAX_HOPS);

        let trace = resolver.trace_chain("/A", Stage::Live).unwrap();
        assert_eq!(
            trace.hops,
            vec![
                ChainHop { id: a.id, pattern: "a".into(), destination: "b".into(), priority: 3 },
                ChainHop { id: b.id, pattern: "b".into(), destination: "c".into(), priority: 0 },
            ]
        );
        assert_eq!(trace.outcome, ChainOutcome::Resolved { destination: "c".into() });

        let trace = resolver.trace_chain("zzz", Stage::Live).unwrap();
        assert!(trace.hops.is_empty());
        assert_eq!(trace.outcome, ChainOutcome::NoMapping);
    }

    #[test]
    fn test_trace_cycle_reports_too_long() {
        let store = InMemoryMappingStore::new();
        let pages = InMemoryPageDirectory::new();
        store.create(NewMapping::literal("a", link("b"))).unwrap();
        store.create(NewMapping::literal("b", link("a"))).unwrap();
        let resolver = ChainResolver::new(MappingMatcher::new(&store, &pages), &pages, 4);

        let trace = resolver.trace_chain("a", Stage::Live).unwrap();
        assert_eq!(trace.outcome, ChainOutcome::TooLong);
        assert_eq!(trace.hops.len(), 4);
    }
}
