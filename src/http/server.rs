//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with site and admin routes
//! - Wire up middleware (tracing, timeout, request ID, link mapping)
//! - Apply configuration updates while serving
//! - Stop gracefully on the shutdown signal

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use axum::{body::Body, http::Request, middleware, routing::any, Router};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::admin;
use crate::config::SiteConfig;
use crate::engine::{LinkMappingEngine, ResolutionSettings};
use crate::http::middleware::link_mapping_middleware;
use crate::http::request::{propagate_request_id_layer, request_id, set_request_id_layer};
use crate::http::site::page_handler;
use crate::lifecycle::{build_engine, StartupError};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<LinkMappingEngine>,
    pub config: Arc<ArcSwap<SiteConfig>>,
}

/// HTTP server for the link mapping service.
pub struct HttpServer {
    router: Router,
    state: AppState,
}

impl HttpServer {
    /// Create a server with an engine seeded from `config`.
    pub fn new(config: SiteConfig) -> Result<Self, StartupError> {
        let engine = Arc::new(build_engine(&config)?);
        Ok(Self::with_engine(config, engine))
    }

    /// Create a server around an existing engine.
    pub fn with_engine(config: SiteConfig, engine: Arc<LinkMappingEngine>) -> Self {
        let state = AppState {
            engine,
            config: Arc::new(ArcSwap::from_pointee(config)),
        };
        let router = Self::build_router(&state);
        Self { router, state }
    }

    /// Build the Axum router with all middleware layers.
    ///
    /// The timeout and the admin switch are read here, once; later config
    /// updates do not change them.
    #[allow(deprecated)]
    fn build_router(state: &AppState) -> Router {
        let config = state.config.load();

        let mut router = Router::new()
            .route("/", any(page_handler))
            .route("/{*path}", any(page_handler))
            .layer(middleware::from_fn_with_state(
                state.clone(),
                link_mapping_middleware,
            ));

        if config.admin.enabled {
            router = router.merge(admin::router(state.clone()));
        }

        router
            .with_state(state.clone())
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(propagate_request_id_layer())
            .layer(
                TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                    tracing::info_span!(
                        "request",
                        request_id = %request_id(request.headers()),
                        method = %request.method(),
                        uri = %request.uri(),
                    )
                }),
            )
            .layer(set_request_id_layer())
    }

    pub fn engine(&self) -> &Arc<LinkMappingEngine> {
        &self.state.engine
    }

    /// Run the server until `shutdown` fires, applying `config_updates`.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<SiteConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let state = self.state.clone();
        let updates = tokio::spawn(async move {
            while let Some(config) = config_updates.recv().await {
                state
                    .engine
                    .update_settings(ResolutionSettings::from(&config));
                state.config.store(Arc::new(config));
                tracing::info!("Configuration update applied");
            }
        });

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received, draining connections");
            })
            .await?;

        updates.abort();
        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
