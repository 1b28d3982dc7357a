//! Link mapping middleware.
//!
//! Lets the site answer first, then asks the engine whether the answer
//! should be replaced by a redirect.

use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};

use crate::engine::{Decision, RequestContext};
use crate::http::request::{request_id, request_stage, request_url};
use crate::http::response::redirect_response;
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::pages::Stage;

/// A finished site request as seen by the engine.
struct HttpRequestContext {
    url: String,
    stage: Stage,
    status: u16,
    redirect: Option<(String, u16)>,
}

impl RequestContext for HttpRequestContext {
    fn url(&self) -> &str {
        &self.url
    }

    fn stage(&self) -> Stage {
        self.stage
    }

    fn response_status(&self) -> u16 {
        self.status
    }

    fn redirect(&mut self, destination: &str, status: u16) {
        self.redirect = Some((destination.to_string(), status));
    }
}

pub async fn link_mapping_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let request_id = request_id(request.headers()).to_string();
    let url = request_url(request.uri());
    let stage = request_stage(request.uri());

    let response = next.run(request).await;

    let mut ctx = HttpRequestContext {
        url,
        stage,
        status: response.status().as_u16(),
        redirect: None,
    };
    let decision = state.engine.apply(&mut ctx);

    let response = match ctx.redirect {
        Some((destination, status)) => match redirect_response(&destination, status) {
            Ok(redirect) => redirect,
            Err(e) => {
                tracing::warn!(
                    request_id = %request_id,
                    destination = %destination,
                    error = %e,
                    "Destination is not a valid Location header, keeping original response"
                );
                response
            }
        },
        None => response,
    };

    if let Decision::Redirect { source, .. } = &decision {
        tracing::debug!(request_id = %request_id, url = %ctx.url, source = ?source, "Response replaced by redirect");
    }
    metrics::record_request(&method, response.status().as_u16(), start);
    response
}
