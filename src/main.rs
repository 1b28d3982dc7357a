//! Link mapping service.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ http server ──▶ site routes (page directory)
//!                          │                 │
//!                          │           404 / response
//!                          │                 ▼
//!                          │        link mapping middleware
//!                          │                 │
//!                          │                 ▼
//!                          │     engine: matcher → chain → status
//!                          │             fallback resolver
//!                          │                 │
//!     Client Response ◀────┴──── redirect or original response
//!
//!     admin API ──▶ mapping store, chain traces, page hooks, history replay
//!     config watcher ──▶ resolution settings swap
//! ```
//!
//! Usage: `link-mapping [CONFIG_PATH]`. Without a path the defaults apply
//! and nothing is watched.

use std::path::PathBuf;

use tokio::net::TcpListener;
use tokio::sync::mpsc;

use link_mapping::config::{load_config, ConfigWatcher, SiteConfig};
use link_mapping::http::HttpServer;
use link_mapping::lifecycle::{signals::shutdown_signal, Shutdown};
use link_mapping::observability::{logging, metrics};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = std::env::args_os().nth(1).map(PathBuf::from);
    let config = match &config_path {
        Some(path) => load_config(path)?,
        None => SiteConfig::default(),
    };

    logging::init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "link-mapping starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        pages = config.pages.len(),
        mappings = config.mappings.len(),
        max_hops = config.resolution.max_hops,
        replace_default = config.resolution.replace_default,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        metrics::init_metrics(config.observability.metrics_address.parse()?)?;
    }

    // The watcher handle must outlive the server.
    let (config_updates, _watcher) = match &config_path {
        Some(path) => {
            let (watcher, updates) = ConfigWatcher::new(path);
            (updates, Some(watcher.run()?))
        }
        None => {
            let (_, updates) = mpsc::unbounded_channel();
            (updates, None)
        }
    };

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let server = HttpServer::new(config)?;

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    let signal_shutdown = shutdown.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        signal_shutdown.trigger();
    });

    server.run(listener, config_updates, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
