use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::engine::{Decision, ResolutionRequest};
use crate::http::server::AppState;
use crate::mapping::normalize::split_url;
use crate::mapping::rule::{Destination, MappingId, NewMapping};
use crate::pages::history::VersionRecord;
use crate::pages::{PageId, Stage};
use crate::store::{MappingFilter, StoreError};

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub mappings: usize,
    pub max_hops: u32,
    pub replace_default: bool,
    pub min_fallback_segments: usize,
    pub auto_map_renames: bool,
}

#[derive(Deserialize)]
pub struct UrlQuery {
    pub url: String,
    /// Overrides the stage carried in the URL's own query string.
    #[serde(default)]
    pub stage: Option<Stage>,
    /// Site response status to resolve against.
    #[serde(default = "default_status")]
    pub status: u16,
}

fn default_status() -> u16 {
    404
}

impl UrlQuery {
    fn stage(&self) -> Stage {
        self.stage
            .unwrap_or_else(|| Stage::from_query(split_url(&self.url).1))
    }
}

#[derive(Deserialize)]
pub struct PageMoved {
    pub old_link: String,
}

fn error_response(status: StatusCode, message: impl ToString) -> Response {
    (status, Json(serde_json::json!({ "error": message.to_string() }))).into_response()
}

fn store_error(e: StoreError) -> Response {
    match e {
        StoreError::Invalid(invalid) => error_response(StatusCode::BAD_REQUEST, invalid),
        StoreError::Unavailable(_) => {
            tracing::error!(error = %e, "Mapping store unavailable");
            error_response(StatusCode::SERVICE_UNAVAILABLE, e)
        }
    }
}

pub async fn get_status(State(state): State<AppState>) -> Response {
    let settings = state.engine.settings();
    let mappings = match state.engine.store().query(&MappingFilter::All) {
        Ok(rules) => rules.len(),
        Err(e) => return store_error(e),
    };

    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        mappings,
        max_hops: settings.resolution.max_hops,
        replace_default: settings.resolution.replace_default,
        min_fallback_segments: settings.resolution.min_fallback_segments,
        auto_map_renames: settings.resolution.auto_map_renames,
    })
    .into_response()
}

pub async fn list_mappings(State(state): State<AppState>) -> Response {
    match state.engine.store().query(&MappingFilter::All) {
        Ok(rules) => Json(rules).into_response(),
        Err(e) => store_error(e),
    }
}

pub async fn create_mapping(
    State(state): State<AppState>,
    Json(new): Json<NewMapping>,
) -> Response {
    let store = state.engine.store();

    if let Destination::Page(page_id) = new.destination {
        let pattern = new.clone().normalized().pattern;
        match store.query(&MappingFilter::PatternAndPage { pattern, page_id }) {
            Ok(existing) if !existing.is_empty() => {
                return error_response(
                    StatusCode::CONFLICT,
                    format!("mapping from {:?} to page {page_id} already exists", new.pattern),
                );
            }
            Ok(_) => {}
            Err(e) => return store_error(e),
        }
    }

    match store.create(new) {
        Ok(rule) => {
            tracing::info!(mapping_id = %rule.id, pattern = %rule.pattern, "Mapping created");
            (StatusCode::CREATED, Json(rule)).into_response()
        }
        Err(e) => store_error(e),
    }
}

pub async fn delete_mapping(State(state): State<AppState>, Path(id): Path<u64>) -> Response {
    match state.engine.store().delete(&MappingFilter::Id(MappingId(id))) {
        Ok(0) => error_response(StatusCode::NOT_FOUND, format!("mapping {id} not found")),
        Ok(_) => {
            tracing::info!(mapping_id = id, "Mapping deleted");
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e) => store_error(e),
    }
}

/// Dry run of the decision the site would make for `url`.
pub async fn resolve_url(State(state): State<AppState>, Query(query): Query<UrlQuery>) -> Json<Decision> {
    let stage = query.stage();
    let request = ResolutionRequest::new(query.url, query.status).with_stage(stage);
    Json(state.engine.decide(&request))
}

pub async fn trace_chain(State(state): State<AppState>, Query(query): Query<UrlQuery>) -> Response {
    match state.engine.trace_chain(&query.url, query.stage()) {
        Ok(trace) => Json(trace).into_response(),
        Err(e) => error_response(StatusCode::UNPROCESSABLE_ENTITY, e),
    }
}

pub async fn replay_history(
    State(state): State<AppState>,
    Json(records): Json<Vec<VersionRecord>>,
) -> Response {
    match state.engine.replay_history(&records) {
        Ok(report) => Json(report).into_response(),
        Err(e) => store_error(e),
    }
}

pub async fn page_moved(
    State(state): State<AppState>,
    Path(id): Path<PageId>,
    Json(body): Json<PageMoved>,
) -> Response {
    match state.engine.page_hooks().on_page_moved(id, &body.old_link) {
        Ok(created) => Json(created).into_response(),
        Err(e) => store_error(e),
    }
}

pub async fn page_removed(State(state): State<AppState>, Path(id): Path<PageId>) -> Response {
    match state.engine.page_hooks().on_page_removed(id) {
        Ok(deleted) => Json(serde_json::json!({ "deleted": deleted })).into_response(),
        Err(e) => store_error(e),
    }
}
