//! HTTP handlers for the redaction server

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use redact_core::protocol::create_path;
use redact_core::{
    generate_redacted, CreateRedactionRequest, PageGeometry, Redaction, RedactionListResponse,
};
use serde::Serialize;
use tracing::info;

use crate::error::ApiError;
use crate::render;
use crate::state::AppState;
use crate::store::Document;

/// Health check endpoint
pub async fn health() -> &'static str {
    "OK"
}

#[derive(Debug, Serialize)]
pub struct DocumentSummary {
    pub id: i64,
    pub title: String,
    pub page_count: i64,
    pub uploaded_at: DateTime<Utc>,
    pub url: String,
}

impl From<Document> for DocumentSummary {
    fn from(d: Document) -> Self {
        Self {
            url: format!("/document/{}/", d.id),
            id: d.id,
            title: d.title,
            page_count: d.page_count,
            uploaded_at: d.uploaded_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DocumentListResponse {
    pub success: bool,
    pub documents: Vec<DocumentSummary>,
    pub count: usize,
}

/// Everything the viewer needs to open a document
#[derive(Debug, Serialize)]
pub struct DocumentDetailResponse {
    pub success: bool,
    pub id: i64,
    pub title: String,
    pub page_count: u32,
    pub uploaded_at: DateTime<Utc>,
    pub file_url: String,
    pub download_url: String,
    pub create_url: String,
    pub pages: Vec<PageGeometry>,
    pub redactions: Vec<Redaction>,
}

/// List all documents, newest first
pub async fn list_documents(
    State(state): State<Arc<AppState>>,
) -> Result<Json<DocumentListResponse>, ApiError> {
    let documents: Vec<DocumentSummary> = state
        .store
        .list_documents()
        .await?
        .into_iter()
        .map(DocumentSummary::from)
        .collect();

    Ok(Json(DocumentListResponse {
        success: true,
        count: documents.len(),
        documents,
    }))
}

pub async fn document_detail(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<DocumentDetailResponse>, ApiError> {
    let document = state.store.get_document(id).await?;
    let info = state.store.document_info(&document).await?;
    let redactions = state.store.list_redactions(id).await?;

    Ok(Json(DocumentDetailResponse {
        success: true,
        id,
        title: document.title,
        page_count: info.page_count,
        uploaded_at: document.uploaded_at,
        file_url: format!("/document/{}/file/", id),
        download_url: format!("/document/{}/download/", id),
        create_url: create_path(id),
        pages: info.pages,
        redactions,
    }))
}

/// The original PDF, for the viewer to render
pub async fn document_file(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    let document = state.store.get_document(id).await?;
    let bytes = state.store.read_file(&document).await?;
    let filename = document
        .file_ref
        .rsplit('/')
        .next()
        .unwrap_or(&document.file_ref);
    Ok(pdf_response(bytes, "inline", filename))
}

pub async fn list_redactions(
    State(state): State<Arc<AppState>>,
    Path(document_id): Path<i64>,
    headers: HeaderMap,
) -> Response {
    let datastar = render::is_datastar(&headers);
    match state.store.list_redactions(document_id).await {
        Ok(redactions) => list_response(document_id, redactions, datastar, StatusCode::OK),
        Err(e) => error_response(e.into(), datastar),
    }
}

/// Create a redaction and answer with the updated list
pub async fn create_redaction(
    State(state): State<Arc<AppState>>,
    Path(document_id): Path<i64>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let datastar = render::is_datastar(&headers);
    match create(&state, document_id, &body).await {
        Ok(redactions) => list_response(document_id, redactions, datastar, StatusCode::CREATED),
        Err(e) => error_response(e, datastar),
    }
}

async fn create(
    state: &AppState,
    document_id: i64,
    body: &[u8],
) -> Result<Vec<Redaction>, ApiError> {
    // Parsed by hand so that malformed bodies get the structured error body
    let request: CreateRedactionRequest =
        serde_json::from_slice(body).map_err(|e| ApiError::InvalidRequest(e.to_string()))?;

    state
        .store
        .create_redaction(document_id, request.kind, &request.coordinates)
        .await?;
    Ok(state.store.list_redactions(document_id).await?)
}

/// Delete a redaction and answer with its document's remaining list
pub async fn delete_redaction(
    State(state): State<Arc<AppState>>,
    Path(redaction_id): Path<i64>,
    headers: HeaderMap,
) -> Response {
    let datastar = render::is_datastar(&headers);
    let result = async {
        let document_id = state.store.delete_redaction(redaction_id).await?;
        let redactions = state.store.list_redactions(document_id).await?;
        Ok::<_, ApiError>((document_id, redactions))
    }
    .await;

    match result {
        Ok((document_id, redactions)) => {
            list_response(document_id, redactions, datastar, StatusCode::OK)
        }
        Err(e) => error_response(e, datastar),
    }
}

/// Generate the redacted PDF on every request
pub async fn download_redacted(
    State(state): State<Arc<AppState>>,
    Path(document_id): Path<i64>,
) -> Result<Response, ApiError> {
    let document = state.store.get_document(document_id).await?;
    let source = state.store.read_file(&document).await?;
    let redactions = state.store.redactions_for_output(document_id).await?;
    let options = state.generator;

    let output =
        tokio::task::spawn_blocking(move || generate_redacted(&source, &redactions, &options))
            .await
            .map_err(|e| ApiError::Internal(e.into()))??;

    info!(
        "Generated redacted PDF for document {}: {} pages modified, {} rectangles, {} glyphs removed",
        document_id, output.pages_modified, output.rects_painted, output.glyphs_removed
    );

    let filename = format!("{}_redacted.pdf", document.title);
    Ok(pdf_response(output.bytes, "attachment", &filename))
}

fn list_response(
    document_id: i64,
    redactions: Vec<Redaction>,
    datastar: bool,
    status: StatusCode,
) -> Response {
    if datastar {
        render::patch_elements([
            render::redaction_list(&redactions),
            render::cleared_notice(),
        ])
        .into_response()
    } else {
        (status, Json(RedactionListResponse::new(document_id, redactions))).into_response()
    }
}

fn error_response(error: ApiError, datastar: bool) -> Response {
    if datastar {
        error.into_datastar_response()
    } else {
        error.into_response()
    }
}

fn pdf_response(bytes: Vec<u8>, disposition: &str, filename: &str) -> Response {
    let value = HeaderValue::from_str(&format!(
        "{}; filename=\"{}\"",
        disposition,
        header_safe_filename(filename)
    ))
    .unwrap_or_else(|_| HeaderValue::from_static("attachment"));

    (
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("application/pdf")),
            (header::CONTENT_DISPOSITION, value),
        ],
        bytes,
    )
        .into_response()
}

/// Printable ASCII without quotes or backslashes
fn header_safe_filename(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            ' '..='~' => c,
            _ => '_',
        })
        .collect()
}
