//! Resolution error definitions.

use thiserror::Error;

use crate::pages::PageId;
use crate::store::StoreError;

/// Errors raised while resolving a request against the mappings.
///
/// None of these reach the client: the engine logs them and treats the
/// request as unmapped, leaving the original response in place.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The redirect chain did not terminate within the hop limit.
    #[error("redirect chain exceeded {hops} hops")]
    ChainTooLong { hops: u32 },

    /// A stored regular expression failed to compile.
    #[error("invalid pattern {pattern:?}: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// A page-reference mapping points at a page that no longer exists.
    #[error("mapping destination page {page_id} does not exist")]
    AmbiguousDestination { page_id: PageId },

    /// The mapping store failed.
    #[error("mapping store error: {0}")]
    Store(#[from] StoreError),
}

impl ResolveError {
    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ChainTooLong { .. } => "chain_too_long",
            Self::InvalidPattern { .. } => "invalid_pattern",
            Self::AmbiguousDestination { .. } => "ambiguous_destination",
            Self::Store(_) => "store",
        }
    }
}

/// Result type for resolution operations.
pub type ResolveResult<T> = Result<T, ResolveError>;
