//! Link mapping subsystem.
//!
//! # Data Flow
//! ```text
//! Request URL (path + query)
//!     → normalize.rs (canonical form)
//!     → matcher.rs (candidates, ordering, stage + query checks)
//!         → pattern.rs (literal / regex test)
//!     → chain.rs (follow destinations, bounded hops)
//!         → pattern.rs (regex substitution against the matched URL)
//!     → status.rs (final 3xx code)
//!     → Return: destination + status, or no mapping
//! ```
//!
//! # Design Decisions
//! - Stored patterns and request URLs are compared canonical-to-canonical
//! - Deterministic: the same data and URL always pick the same rule
//! - Broken rules are skipped rather than failing the lookup
//! - No state is kept between resolutions

pub mod chain;
pub mod error;
pub mod matcher;
pub mod normalize;
pub mod pattern;
pub mod rule;
pub mod status;

pub use chain::{ChainHop, ChainOutcome, ChainResolver, ChainTrace, DEFAULT_MAX_HOPS};
pub use error::{ResolveError, ResolveResult};
pub use matcher::{MappingMatcher, MatchedMapping};
pub use normalize::normalize;
pub use rule::{Destination, MappingId, MappingRule, NewMapping, PatternType};
pub use status::resolve_status;
