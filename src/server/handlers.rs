//! Route handlers. Filesystem work runs on the blocking pool.

use std::path::PathBuf;
use std::time::Instant;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use super::AppState;
use super::error::ApiError;
use crate::cache::{ARTIFACT_EXTENSION, Fingerprint, Namespace};
use crate::datasource::{DataSourceError, FileNode};
use crate::pipeline::{Backpressure, StatsSnapshot};

pub async fn ping() -> Json<Value> {
    let start = Instant::now();
    Json(json!({
        "message": "ok",
        "latency": start.elapsed().as_millis() as u64,
    }))
}

#[derive(Debug, Serialize)]
pub struct SourceSummary {
    pub name: String,
    pub metadata: Map<String, Value>,
}

pub async fn list_sources(State(state): State<AppState>) -> Result<Json<Vec<SourceSummary>>, ApiError> {
    let service = state.service.clone();
    let summaries = tokio::task::spawn_blocking(move || {
        let records = service.sources().get()?;
        let filter = service.filter();
        Ok::<_, ApiError>(
            records
                .into_iter()
                .map(|(name, record)| SourceSummary {
                    name,
                    metadata: record.open(&filter).describe(),
                })
                .collect::<Vec<_>>(),
        )
    })
    .await??;

    crate::debug_event!("http", "listed sources", "{}", summaries.len());
    Ok(Json(summaries))
}

#[derive(Debug, Deserialize)]
pub struct AddSourceRequest {
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    #[serde(default)]
    pub path: PathBuf,
}

pub async fn add_source(
    State(state): State<AppState>,
    payload: Result<Json<AddSourceRequest>, axum::extract::rejection::JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(request) = payload.map_err(|e| {
        tracing::warn!("[http] invalid add-source body: {e}");
        ApiError::bad_request("invalid input")
    })?;
    if request.name.trim().is_empty() || request.kind.trim().is_empty() {
        return Err(ApiError::bad_request("invalid input"));
    }

    let service = state.service.clone();
    let record = tokio::task::spawn_blocking(move || {
        service.add_source(&request.name, &request.kind, &request.path)
    })
    .await?
    .map_err(|e| match e {
        // A missing root is bad input here, not a missing resource.
        DataSourceError::NotFound { .. } => ApiError::bad_request(e.to_string()),
        e => ApiError::from(e),
    })?;

    Ok(Json(json!({ "status": "data source added", "id": record.id })))
}

#[derive(Debug, Default, Deserialize)]
pub struct PathQuery {
    #[serde(default)]
    pub path: String,
}

pub async fn list_files(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<PathQuery>,
) -> Result<Json<FileNode>, ApiError> {
    let service = state.service.clone();
    let tree = tokio::task::spawn_blocking(move || {
        let (record, source) = service.open_source(&name)?;
        let mut tree = source.list_files(&query.path)?;
        tree.attach_thumbnails(service.namespace_for(&record).as_ref());
        Ok::<_, ApiError>(tree)
    })
    .await??;

    Ok(Json(tree))
}

pub async fn read_file(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<PathQuery>,
) -> Result<Response, ApiError> {
    let content_type = content_type_for(&query.path);
    let service = state.service.clone();
    let bytes = tokio::task::spawn_blocking(move || {
        let (_, source) = service.open_source(&name)?;
        Ok::<_, ApiError>(source.read_file(&query.path)?)
    })
    .await??;

    Ok(([(header::CONTENT_TYPE, content_type)], bytes).into_response())
}

pub async fn cached_artifact(
    State(state): State<AppState>,
    Path(file): Path<String>,
) -> Result<Response, ApiError> {
    serve_artifact(&state, None, &file).await
}

pub async fn cached_namespaced_artifact(
    State(state): State<AppState>,
    Path((namespace, file)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let namespace =
        Namespace::parse(&namespace).ok_or_else(|| ApiError::bad_request("invalid namespace"))?;
    serve_artifact(&state, Some(&namespace), &file).await
}

async fn serve_artifact(
    state: &AppState,
    namespace: Option<&Namespace>,
    file: &str,
) -> Result<Response, ApiError> {
    // Only `<hex>.pdf` names resolve, so a request cannot leave the cache.
    let fingerprint = file
        .strip_suffix(&format!(".{ARTIFACT_EXTENSION}"))
        .and_then(|hex| hex.parse::<Fingerprint>().ok())
        .ok_or_else(|| ApiError::bad_request("invalid artifact name"))?;

    let location = state.service.store().locate(&fingerprint, namespace);
    match tokio::fs::read(&location).await {
        Ok(bytes) => Ok(([(header::CONTENT_TYPE, "application/pdf")], bytes).into_response()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(ApiError::not_found("artifact not rendered yet"))
        }
        Err(e) => {
            tracing::error!("[http] reading {}: {e}", location.display());
            Err(ApiError::internal("failed to read artifact"))
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Status {
    pub pending: usize,
    pub in_flight: usize,
    pub debounce_ms: u64,
    pub backpressure: Backpressure,
    pub stats: StatsSnapshot,
    pub watched_roots: usize,
}

pub async fn status(State(state): State<AppState>) -> Json<Status> {
    let pipeline = state.service.pipeline();
    Json(Status {
        pending: pipeline.queue().pending(),
        in_flight: pipeline.in_flight(),
        debounce_ms: pipeline.debouncer().window().as_millis() as u64,
        backpressure: pipeline.queue().policy(),
        stats: pipeline.stats(),
        watched_roots: state
            .service
            .watcher()
            .map(|watcher| watcher.roots().len())
            .unwrap_or(0),
    })
}

fn content_type_for(path: &str) -> &'static str {
    if path.to_ascii_lowercase().ends_with(".pdf") {
        "application/pdf"
    } else {
        "application/octet-stream"
    }
}
