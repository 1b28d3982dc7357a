//! Mapping persistence subsystem.
//!
//! # Data Flow
//! ```text
//! Matcher / admin API / page hooks
//!     → MappingStore::query(filter)   (ordered rules)
//!     → MappingStore::create(new)     (validated, normalized, id assigned)
//!     → MappingStore::delete(filter)  (count removed)
//! ```
//!
//! # Design Decisions
//! - The store is a collaborator behind a trait; the engine never assumes a
//!   particular backend
//! - A backend that can evaluate patterns natively advertises it through
//!   `supports_pattern_filter`; otherwise the matcher fetches everything and
//!   filters in-process, with identical results
//! - Uniqueness of `(pattern, page)` is the caller's job, not the store's

pub mod memory;

use thiserror::Error;

use crate::mapping::rule::{InvalidMapping, MappingId, MappingRule, NewMapping};
use crate::pages::PageId;

pub use memory::InMemoryMappingStore;

/// Selects a subset of stored mappings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MappingFilter {
    /// Every stored mapping.
    All,
    /// Literal mappings whose path equals `path`, plus regex mappings that
    /// match `path`. Only honoured by stores that support pattern filtering.
    Candidates { path: String },
    /// A single mapping.
    Id(MappingId),
    /// Page-reference mappings pointing at the page.
    DestinationPage(PageId),
    /// Mappings with exactly this pattern pointing at the page.
    PatternAndPage { pattern: String, page_id: PageId },
}

/// Errors returned by a mapping store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The mapping failed validation.
    #[error("invalid mapping: {0}")]
    Invalid(#[from] InvalidMapping),

    /// The backing store could not serve the request.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence contract for mapping rules.
pub trait MappingStore: Send + Sync {
    /// Rules selected by `filter`, highest precedence first.
    fn query(&self, filter: &MappingFilter) -> StoreResult<Vec<MappingRule>>;

    /// Validate, normalize and store a new rule.
    fn create(&self, new: NewMapping) -> StoreResult<MappingRule>;

    /// Remove the selected rules, returning how many were removed.
    fn delete(&self, filter: &MappingFilter) -> StoreResult<usize>;

    /// Whether `MappingFilter::Candidates` is evaluated by the store.
    fn supports_pattern_filter(&self) -> bool {
        false
    }
}
