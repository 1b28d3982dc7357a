//! Request-level resolution: mappings first, then fallback rules.
//!
//! # Responsibilities
//! - Decide whether a finished request should be answered with a redirect
//! - Own the mapping store and page directory shared by every request
//! - Hold the resolution settings, swappable on config reload
//! - Expose the diagnostic and maintenance operations the admin API uses
//!
//! # Design Decisions
//! - Resolution is synchronous; the engine is shared through `Arc`
//! - No resolution error reaches the client: each one is logged, counted,
//!   and the request falls through as if nothing matched
//! - Settings are read once per decision, so a reload never mixes two
//!   configurations within one request
//!
//! # Data Flow
//! ```text
//! RequestContext (url, stage, response status)
//!     → status 404?          → MappingMatcher → ChainResolver → status policy
//!     → 404 or replace_default → FallbackResolver
//!     → Decision::Redirect / Decision::NoAction
//! ```

use std::sync::Arc;

use arc_swap::ArcSwap;
use serde::Serialize;

use crate::config::schema::{ResolutionConfig, SiteConfig};
use crate::fallback::{FallbackRedirect, FallbackResolver};
use crate::mapping::chain::{ChainResolver, ChainTrace};
use crate::mapping::error::{ResolveError, ResolveResult};
use crate::mapping::matcher::{MappingMatcher, MatchedMapping};
use crate::mapping::normalize::{restore_scheme_separator, split_url};
use crate::mapping::rule::MappingId;
use crate::mapping::status::resolve_status;
use crate::observability::metrics;
use crate::pages::history::{replay_history, HistoryReport, VersionRecord};
use crate::pages::hooks::PageHooks;
use crate::pages::{FallbackPolicy, PageDirectory, Stage};
use crate::store::{MappingStore, StoreResult};

/// Status that triggers mapping lookup.
const NOT_FOUND: u16 = 404;

/// Behaviour flags for resolution, replaced as a whole on reload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolutionSettings {
    pub resolution: ResolutionConfig,
    /// Site-wide fallback rule.
    pub fallback: Option<FallbackPolicy>,
}

impl From<&SiteConfig> for ResolutionSettings {
    fn from(config: &SiteConfig) -> Self {
        Self {
            resolution: config.resolution.clone(),
            fallback: config.fallback.clone(),
        }
    }
}

/// What the engine needs from a request, and how it answers.
pub trait RequestContext {
    /// Request path and query as received.
    fn url(&self) -> &str;

    /// Site stage the request reads.
    fn stage(&self) -> Stage;

    /// Status the site produced for the request.
    fn response_status(&self) -> u16;

    /// Replace the response with a redirect.
    fn redirect(&mut self, destination: &str, status: u16);
}

/// Where a redirect decision came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DecisionSource {
    Mapping { id: MappingId },
    Fallback,
}

impl DecisionSource {
    fn label(&self) -> &'static str {
        match self {
            DecisionSource::Mapping { .. } => "mapping",
            DecisionSource::Fallback => "fallback",
        }
    }
}

/// The engine's answer for a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Decision {
    Redirect {
        destination: String,
        status: u16,
        source: DecisionSource,
    },
    NoAction,
}

/// A mapping resolved to its final destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedMapping {
    pub id: MappingId,
    pub destination: String,
    pub status: u16,
}

/// A plain request description, for callers outside the HTTP stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionRequest {
    pub url: String,
    pub stage: Stage,
    pub response_status: u16,
    /// Set by [`RequestContext::redirect`].
    pub redirected: Option<(String, u16)>,
}

impl ResolutionRequest {
    /// A request for `url`; the stage is read from its query string.
    pub fn new(url: impl Into<String>, response_status: u16) -> Self {
        let url = url.into();
        let stage = Stage::from_query(split_url(&url).1);
        Self {
            url,
            stage,
            response_status,
            redirected: None,
        }
    }

    pub fn with_stage(mut self, stage: Stage) -> Self {
        self.stage = stage;
        self
    }
}

impl RequestContext for ResolutionRequest {
    fn url(&self) -> &str {
        &self.url
    }

    fn stage(&self) -> Stage {
        self.stage
    }

    fn response_status(&self) -> u16 {
        self.response_status
    }

    fn redirect(&mut self, destination: &str, status: u16) {
        self.redirected = Some((destination.to_string(), status));
    }
}

/// Resolves requests against the mapping store and page directory.
pub struct LinkMappingEngine {
    store: Arc<dyn MappingStore>,
    pages: Arc<dyn PageDirectory>,
    settings: ArcSwap<ResolutionSettings>,
}

impl LinkMappingEngine {
    pub fn new(
        store: Arc<dyn MappingStore>,
        pages: Arc<dyn PageDirectory>,
        settings: ResolutionSettings,
    ) -> Self {
        Self {
            store,
            pages,
            settings: ArcSwap::from_pointee(settings),
        }
    }

    /// Current settings snapshot.
    pub fn settings(&self) -> Arc<ResolutionSettings> {
        self.settings.load_full()
    }

    /// Atomically replace the settings; in-flight decisions keep the old ones.
    pub fn update_settings(&self, settings: ResolutionSettings) {
        tracing::info!(
            max_hops = settings.resolution.max_hops,
            replace_default = settings.resolution.replace_default,
            min_fallback_segments = settings.resolution.min_fallback_segments,
            "Resolution settings updated"
        );
        self.settings.store(Arc::new(settings));
    }

    pub fn store(&self) -> &Arc<dyn MappingStore> {
        &self.store
    }

    pub fn pages(&self) -> &Arc<dyn PageDirectory> {
        &self.pages
    }

    fn matcher(&self) -> MappingMatcher<'_> {
        MappingMatcher::new(self.store.as_ref(), self.pages.as_ref())
    }

    fn chain(&self, max_hops: u32) -> ChainResolver<'_> {
        ChainResolver::new(self.matcher(), self.pages.as_ref(), max_hops)
    }

    /// Best mapping for `url`, without following chains.
    pub fn find_mapping(&self, url: &str, stage: Stage) -> ResolveResult<Option<MatchedMapping>> {
        self.matcher().find_mapping(url, stage)
    }

    /// Best mapping for `url`, followed to its final destination.
    pub fn resolve_mapping(&self, url: &str, stage: Stage) -> ResolveResult<Option<ResolvedMapping>> {
        let settings = self.settings.load();
        self.resolve_mapping_with(url, stage, settings.resolution.max_hops)
    }

    fn resolve_mapping_with(
        &self,
        url: &str,
        stage: Stage,
        max_hops: u32,
    ) -> ResolveResult<Option<ResolvedMapping>> {
        let Some(matched) = self.matcher().find_mapping(url, stage)? else {
            return Ok(None);
        };
        let destination = self.chain(max_hops).resolve_chain(&matched, stage)?;
        Ok(Some(ResolvedMapping {
            id: matched.rule.id,
            status: resolve_status(&matched.rule),
            destination,
        }))
    }

    /// Fallback redirect for `url`, if a fallback rule covers its missing node.
    pub fn resolve_fallback(&self, url: &str, stage: Stage) -> Option<FallbackRedirect> {
        let settings = self.settings.load();
        Self::fallback_with(self.pages.as_ref(), &settings, url, stage)
    }

    fn fallback_with(
        pages: &dyn PageDirectory,
        settings: &ResolutionSettings,
        url: &str,
        stage: Stage,
    ) -> Option<FallbackRedirect> {
        FallbackResolver::new(
            pages,
            settings.fallback.as_ref(),
            &settings.resolution.site_root,
            settings.resolution.min_fallback_segments,
        )
        .resolve_fallback(url, stage)
    }

    /// Every hop from `url` to its final destination.
    pub fn trace_chain(&self, url: &str, stage: Stage) -> ResolveResult<ChainTrace> {
        let settings = self.settings.load();
        self.chain(settings.resolution.max_hops).trace_chain(url, stage)
    }

    /// Decide how to answer a finished request.
    pub fn decide(&self, ctx: &impl RequestContext) -> Decision {
        let settings = self.settings.load_full();
        let url = restore_scheme_separator(ctx.url());
        let stage = ctx.stage();
        let status = ctx.response_status();

        if status == NOT_FOUND {
            match self.resolve_mapping_with(&url, stage, settings.resolution.max_hops) {
                Ok(Some(resolved)) => {
                    return Self::redirect(
                        &url,
                        resolved.destination,
                        resolved.status,
                        DecisionSource::Mapping { id: resolved.id },
                    );
                }
                Ok(None) => {}
                Err(e) => Self::swallow(&url, &e),
            }
        }

        if status == NOT_FOUND || settings.resolution.replace_default {
            if let Some(fallback) = Self::fallback_with(self.pages.as_ref(), &settings, &url, stage) {
                return Self::redirect(
                    &url,
                    fallback.destination,
                    fallback.status,
                    DecisionSource::Fallback,
                );
            }
        }

        Decision::NoAction
    }

    /// Decide, and redirect `ctx` if the decision calls for it.
    pub fn apply(&self, ctx: &mut impl RequestContext) -> Decision {
        let decision = self.decide(ctx);
        if let Decision::Redirect {
            destination,
            status,
            ..
        } = &decision
        {
            ctx.redirect(destination, *status);
        }
        decision
    }

    fn redirect(url: &str, destination: String, status: u16, source: DecisionSource) -> Decision {
        tracing::info!(
            url = %url,
            destination = %destination,
            status,
            source = source.label(),
            "Redirecting request"
        );
        metrics::record_decision(source.label());
        Decision::Redirect {
            destination,
            status,
            source,
        }
    }

    fn swallow(url: &str, err: &ResolveError) {
        tracing::warn!(url = %url, error = %err, "Mapping resolution failed, treating as unmapped");
        metrics::record_error(err.kind());
    }

    /// Mapping maintenance hooks bound to this engine's store and pages.
    pub fn page_hooks(&self) -> PageHooks {
        PageHooks::new(
            Arc::clone(&self.store),
            Arc::clone(&self.pages),
            self.settings.load().resolution.auto_map_renames,
        )
    }

    /// Backfill mappings from published page versions.
    pub fn replay_history(&self, records: &[VersionRecord]) -> StoreResult<HistoryReport> {
        replay_history(records, self.store.as_ref(), self.pages.as_ref())
    }
}
