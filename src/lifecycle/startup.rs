//! Startup orchestration.
//!
//! # Responsibilities
//! - Seed the page directory and mapping store from configuration
//! - Build the engine with the configured resolution settings
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Seeds go through the same validation as admin writes

use std::sync::Arc;

use thiserror::Error;

use crate::config::loader::ConfigError;
use crate::config::schema::SiteConfig;
use crate::engine::{LinkMappingEngine, ResolutionSettings};
use crate::pages::memory::InMemoryPageDirectory;
use crate::store::{InMemoryMappingStore, StoreError};

/// Errors that abort startup.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to seed mappings: {0}")]
    Seed(#[from] StoreError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("metrics exporter error: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),
}

/// Build an engine backed by in-memory stores seeded from `config`.
pub fn build_engine(config: &SiteConfig) -> Result<LinkMappingEngine, StartupError> {
    let pages = Arc::new(InMemoryPageDirectory::with_pages(config.pages.iter().cloned()));
    let store = Arc::new(InMemoryMappingStore::with_mappings(config.mappings.iter().cloned())?);

    tracing::info!(
        pages = config.pages.len(),
        mappings = store.len(),
        "Seeded page directory and mapping store"
    );

    Ok(LinkMappingEngine::new(
        store,
        pages,
        ResolutionSettings::from(config),
    ))
}
