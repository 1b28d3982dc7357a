//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use link_mapping::config::SiteConfig;
use link_mapping::engine::{LinkMappingEngine, ResolutionSettings};
use link_mapping::http::HttpServer;
use link_mapping::lifecycle::Shutdown;
use link_mapping::mapping::{Destination, NewMapping};
use link_mapping::pages::memory::{InMemoryPageDirectory, PageSeed};
use link_mapping::pages::{FallbackPolicy, FallbackRule, PageId, ROOT_PAGE_ID};
use link_mapping::store::InMemoryMappingStore;

pub const ADMIN_KEY: &str = "test-admin-key";

pub fn page(id: PageId, parent_id: PageId, segment: &str) -> PageSeed {
    PageSeed {
        id,
        parent_id,
        segment: segment.into(),
        published: true,
        fallback: None,
    }
}

pub fn link(to: &str) -> Destination {
    Destination::Link(to.into())
}

/// Engine over fresh in-memory stores, returning the stores for inspection.
pub fn engine(
    pages: impl IntoIterator<Item = PageSeed>,
    mappings: impl IntoIterator<Item = NewMapping>,
    settings: ResolutionSettings,
) -> (
    LinkMappingEngine,
    Arc<InMemoryMappingStore>,
    Arc<InMemoryPageDirectory>,
) {
    let store = Arc::new(InMemoryMappingStore::with_mappings(mappings).unwrap());
    let pages = Arc::new(InMemoryPageDirectory::with_pages(pages));
    let engine = LinkMappingEngine::new(store.clone(), pages.clone(), settings);
    (engine, store, pages)
}

/// A small site:
///
/// ```text
/// /about (1)          fallback: this page, 302
/// /about/team (2)
/// /docs (3)
/// /preview (4)        draft only
/// ```
pub fn site_config(addr: SocketAddr) -> SiteConfig {
    let mut config = SiteConfig::default();
    config.listener.bind_address = addr.to_string();
    config.admin.enabled = true;
    config.admin.api_key = ADMIN_KEY.into();
    config.fallback = Some(FallbackPolicy {
        rule: FallbackRule::NearestParent,
        ..FallbackPolicy::default()
    });

    let mut about = page(1, ROOT_PAGE_ID, "about");
    about.fallback = Some(FallbackPolicy {
        rule: FallbackRule::ThisPage,
        url: String::new(),
        response_code: 302,
    });
    let mut preview = page(4, ROOT_PAGE_ID, "preview");
    preview.published = false;
    config.pages = vec![about, page(2, 1, "team"), page(3, ROOT_PAGE_ID, "docs"), preview];

    config.mappings = vec![
        NewMapping::literal("/old-about", Destination::Page(1)).with_status(301, false),
        NewMapping::regex("^news/(.*)$", link("blog/$1")),
        NewMapping::literal("/draft-link", Destination::Page(4)),
        NewMapping::literal("/external", link("https://example.com/landing")).with_status(308, false),
    ];
    config
}

/// Start a server on `config.listener.bind_address`.
///
/// Returns the shutdown handle and the config update sender; dropping the
/// sender leaves the server running.
pub async fn start_server(config: SiteConfig) -> (Shutdown, mpsc::UnboundedSender<SiteConfig>) {
    let shutdown = Shutdown::new();
    let (updates_tx, updates_rx) = mpsc::unbounded_channel();
    let listener = tokio::net::TcpListener::bind(&config.listener.bind_address)
        .await
        .unwrap();
    let server = HttpServer::new(config).unwrap();
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, updates_rx, server_shutdown).await;
    });

    tokio::time::sleep(Duration::from_millis(300)).await;
    (shutdown, updates_tx)
}

/// Client that reports redirects instead of following them.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
