//! Page routes served from the page directory.

use axum::{
    extract::State,
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
    Json,
};

use crate::http::request::request_stage;
use crate::http::server::AppState;
use crate::pages::{find_by_path, path_segments};

/// Serve the page a path names, or 404 so the link mapping layer can act.
pub async fn page_handler(State(state): State<AppState>, uri: Uri) -> Response {
    if path_segments(uri.path()).is_empty() {
        return (StatusCode::OK, "Home").into_response();
    }

    let stage = request_stage(&uri);
    match find_by_path(state.engine.pages().as_ref(), uri.path(), stage) {
        Some(page) => Json(page).into_response(),
        None => (StatusCode::NOT_FOUND, "Page not found").into_response(),
    }
}
