//! Link mapping resolution service.
//!
//! Turns requests for URLs that no longer name a page into redirects:
//! first through explicit mappings (literal or regex, chained), then through
//! per-page fallback rules inherited down the site tree.

pub mod admin;
pub mod config;
pub mod engine;
pub mod fallback;
pub mod http;
pub mod lifecycle;
pub mod mapping;
pub mod observability;
pub mod pages;
pub mod store;

pub use config::schema::SiteConfig;
pub use engine::{Decision, DecisionSource, LinkMappingEngine, RequestContext, ResolutionRequest};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
