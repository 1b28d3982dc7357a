//! Admin API for inspecting and maintaining mappings.
//!
//! Every route requires `Authorization: Bearer <admin.api_key>`.

pub mod auth;
pub mod handlers;

use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::http::server::AppState;

pub fn router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/mappings", get(list_mappings).post(create_mapping))
        .route("/admin/mappings/{id}", delete(delete_mapping))
        .route("/admin/resolve", get(resolve_url))
        .route("/admin/chain", get(trace_chain))
        .route("/admin/history", post(replay_history))
        .route("/admin/pages/{id}/moved", post(page_moved))
        .route("/admin/pages/{id}/removed", post(page_removed))
        .layer(middleware::from_fn_with_state(state, admin_auth_middleware))
}
