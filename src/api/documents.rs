// 文档 API：内容提取、缓存维护与本地文件选择。
use crate::api::errors::{error_response, error_response_with_code};
use crate::services::extract::DocumentFormat;
use crate::state::AppState;
use axum::extract::{DefaultBodyLimit, Multipart, Path as AxumPath, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{delete, get};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

const MAX_LOCAL_FILE_UPLOAD_BYTES: usize = 64 * 1024 * 1024;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/documents/{filename}", get(get_document))
        .route("/api/documents/{filename}/html", get(get_document_html))
        .route("/api/status", get(status))
        .route("/api/cache", get(cache_info).delete(clear_cache))
        .route("/api/cache/{extension}", delete(clear_format_cache))
        .route(
            "/api/local-files",
            get(list_local_files)
                .post(upload_local_files)
                .layer(DefaultBodyLimit::max(MAX_LOCAL_FILE_UPLOAD_BYTES)),
        )
}

async fn get_document(
    State(state): State<Arc<AppState>>,
    AxumPath(filename): AxumPath<String>,
) -> Result<Response, Response> {
    let filename = validate_filename(&filename)?;
    let outcome = state.extractor.extract(&filename).await;
    Ok(Json(outcome).into_response())
}

async fn get_document_html(
    State(state): State<Arc<AppState>>,
    AxumPath(filename): AxumPath<String>,
) -> Result<Response, Response> {
    let filename = validate_filename(&filename)?;
    let outcome = state.extractor.extract(&filename).await;
    Ok(Html(outcome.html_content).into_response())
}

async fn status(State(state): State<Arc<AppState>>) -> Json<Value> {
    let formats = state
        .extractor
        .registry()
        .available_formats()
        .into_iter()
        .map(|format| format.extension())
        .collect::<Vec<_>>();
    Json(json!({
        "ready": state.extractor.is_ready(),
        "fileProtocolMode": state.file_protocol_mode(),
        "formats": formats,
        "cache": state.extractor.cache_info(),
    }))
}

async fn cache_info(State(state): State<Arc<AppState>>) -> Response {
    Json(state.extractor.cache_info()).into_response()
}

async fn clear_cache(State(state): State<Arc<AppState>>) -> Json<Value> {
    let cleared = state.extractor.clear_cache();
    Json(json!({ "ok": true, "cleared": cleared }))
}

async fn clear_format_cache(
    State(state): State<Arc<AppState>>,
    AxumPath(extension): AxumPath<String>,
) -> Result<Json<Value>, Response> {
    let normalized = extension.trim().trim_start_matches('.');
    if normalized.is_empty() || DocumentFormat::from_extension(normalized).is_none() {
        return Err(error_response_with_code(
            StatusCode::BAD_REQUEST,
            Some("INVALID_EXTENSION"),
            format!("unknown document extension: {extension}"),
        ));
    }
    let cleared = state.extractor.clear_format_cache(normalized);
    Ok(Json(json!({ "ok": true, "cleared": cleared })))
}

async fn list_local_files(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "fileProtocolMode": state.file_protocol_mode(),
        "files": state.picked_files.filenames(),
    }))
}

async fn upload_local_files(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<Value>, Response> {
    let mut added = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| error_response(StatusCode::BAD_REQUEST, err.to_string()))?
    {
        let Some(raw_name) = field.file_name().map(str::to_string) else {
            continue;
        };
        let filename = validate_filename(base_name(&raw_name))?;
        let data = field
            .bytes()
            .await
            .map_err(|err| error_response(StatusCode::BAD_REQUEST, err.to_string()))?;
        info!("local file selected: {filename} ({} bytes)", data.len());
        state.picked_files.insert(filename.clone(), data);
        state.extractor.invalidate(&filename);
        added.push(filename);
    }
    if added.is_empty() {
        return Err(error_response_with_code(
            StatusCode::BAD_REQUEST,
            Some("NO_FILES"),
            "no file fields found in request",
        ));
    }
    Ok(Json(json!({
        "ok": true,
        "added": added,
        "files": state.picked_files.filenames(),
    })))
}

fn base_name(raw: &str) -> &str {
    raw.rsplit(['/', '\\']).next().unwrap_or(raw)
}

fn validate_filename(raw: &str) -> Result<String, Response> {
    let filename = raw.trim();
    if filename.is_empty() || filename.contains('/') || filename.contains('\\') {
        return Err(error_response_with_code(
            StatusCode::BAD_REQUEST,
            Some("INVALID_FILENAME"),
            format!("invalid filename: {raw}"),
        ));
    }
    Ok(filename.to_string())
}
