//! Document Set Handlers
//!
//! Upload, inspection, reprocessing and download of document sets.

use axum::{
    body::Body,
    extract::{multipart::MultipartError, Multipart, Path, Query, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use chemdocs_database::{DocumentSetRepository, TestResultRepository};
use chemdocs_models::{DocumentKind, DocumentSet, ProcessingStatus, TestResult};
use chemdocs_utils::{product_file_stem, ChemdocsError};

use crate::bundle::build_bundle;
use crate::error::{ApiError, ApiResult};
use crate::generator::download_file_name;
use crate::upload::{UploadFormBuilder, UploadedFile, PRODUCT_NAME_FIELD};
use crate::AppState;

const DEFAULT_LIST_LIMIT: i64 = 5;
const MAX_LIST_LIMIT: i64 = 100;

/// A document set with its extracted test results
#[derive(Debug, Serialize)]
pub struct DocumentSetResponse {
    #[serde(flatten)]
    pub document_set: DocumentSet,
    pub test_results: Vec<TestResult>,
    pub reused: bool,
    pub downloads: Vec<DownloadLink>,
}

#[derive(Debug, Serialize)]
pub struct DownloadLink {
    pub document_type: DocumentKind,
    pub title: &'static str,
    pub url: String,
}

/// Row of the recent uploads list
#[derive(Debug, Serialize)]
pub struct DocumentSetSummary {
    pub id: i64,
    pub company_product_name: String,
    pub status: ProcessingStatus,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<DocumentSet> for DocumentSetSummary {
    fn from(set: DocumentSet) -> Self {
        Self {
            id: set.id,
            company_product_name: set.company_product_name,
            status: set.status,
            error_message: set.error_message,
            created_at: set.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub limit: Option<i64>,
}

/// Upload three supplier PDFs and run the pipeline
///
/// POST /api/v1/document-sets
pub async fn upload_document_set(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<(StatusCode, Json<DocumentSetResponse>)> {
    let max_file_size = state.config.storage.max_file_size;
    let mut builder = UploadFormBuilder::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, max_file_size))?
    {
        let name = field.name().unwrap_or_default().to_string();

        if name == PRODUCT_NAME_FIELD {
            let text = field.text().await.map_err(|e| multipart_error(e, max_file_size))?;
            builder.product_name(text);
        } else if let Some(kind) = DocumentKind::from_form_field(&name) {
            let file_name = field.file_name().unwrap_or_default().to_string();
            let data = field.bytes().await.map_err(|e| multipart_error(e, max_file_size))?;
            builder.file(
                kind,
                UploadedFile {
                    file_name,
                    data: data.to_vec(),
                },
            );
        } else {
            tracing::debug!(field = %name, "Ignoring unknown form field");
        }
    }

    let form = builder.build(max_file_size)?;
    let outcome = state.pipeline.process_upload(form).await?;

    let status = match (outcome.reused, outcome.document_set.status) {
        (true, _) => StatusCode::OK,
        (false, ProcessingStatus::Generated) => StatusCode::CREATED,
        _ => StatusCode::UNPROCESSABLE_ENTITY,
    };

    let response = document_set_response(&state, outcome.document_set, outcome.reused).await?;
    Ok((status, Json(response)))
}

/// Recent uploads, newest first
///
/// GET /api/v1/document-sets?limit=5
pub async fn list_document_sets(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<Vec<DocumentSetSummary>>> {
    let limit = params
        .limit
        .unwrap_or(DEFAULT_LIST_LIMIT)
        .clamp(1, MAX_LIST_LIMIT);

    let sets = DocumentSetRepository::new(state.pool.clone())
        .list_recent(limit)
        .await?;

    Ok(Json(sets.into_iter().map(DocumentSetSummary::from).collect()))
}

/// GET /api/v1/document-sets/:id
pub async fn get_document_set(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<DocumentSetResponse>> {
    let document_set = find_document_set(&state, id).await?;
    Ok(Json(document_set_response(&state, document_set, false).await?))
}

/// POST /api/v1/document-sets/:id/reprocess
pub async fn reprocess_document_set(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<(StatusCode, Json<DocumentSetResponse>)> {
    let document_set = state.pipeline.reprocess(id).await?;

    let status = if document_set.status == ProcessingStatus::Generated {
        StatusCode::OK
    } else {
        StatusCode::UNPROCESSABLE_ENTITY
    };

    Ok((status, Json(document_set_response(&state, document_set, false).await?)))
}

/// One generated PDF as an attachment
///
/// GET /api/v1/document-sets/:id/documents/:doc_type
pub async fn download_document(
    State(state): State<AppState>,
    Path((id, doc_type)): Path<(i64, String)>,
) -> ApiResult<Response> {
    let kind = DocumentKind::from_str(&doc_type)
        .map_err(|_| ChemdocsError::validation("doc_type", format!("Unknown document type '{}'", doc_type)))?;

    let document_set = find_document_set(&state, id).await?;
    let data = read_generated(&state, &document_set, kind).await?;

    let file_name = download_file_name(
        &state.config.branding.batch_prefix,
        kind,
        &document_set.company_product_name,
    );
    attachment(data, "application/pdf", &file_name)
}

/// The three generated PDFs in one zip archive
///
/// GET /api/v1/document-sets/:id/bundle
pub async fn download_bundle(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Response> {
    let document_set = find_document_set(&state, id).await?;
    let prefix = &state.config.branding.batch_prefix;

    let mut entries = Vec::with_capacity(DocumentKind::ALL.len());
    for kind in DocumentKind::ALL {
        let data = read_generated(&state, &document_set, kind).await?;
        entries.push((
            download_file_name(prefix, kind, &document_set.company_product_name),
            data,
        ));
    }

    let archive = tokio::task::spawn_blocking(move || build_bundle(&entries))
        .await
        .map_err(|e| ChemdocsError::internal(e.to_string()))?
        .map_err(|e| ChemdocsError::document_generation(format!("{:#}", e)))?;

    let file_name = format!(
        "{}_{}.zip",
        prefix,
        product_file_stem(&document_set.company_product_name)
    );
    attachment(archive, "application/zip", &file_name)
}

async fn find_document_set(state: &AppState, id: i64) -> ApiResult<DocumentSet> {
    DocumentSetRepository::new(state.pool.clone())
        .find_by_id(id)
        .await?
        .ok_or_else(|| ChemdocsError::not_found(format!("Document set {}", id)).into())
}

async fn read_generated(state: &AppState, document_set: &DocumentSet, kind: DocumentKind) -> ApiResult<Vec<u8>> {
    let not_found = || ApiError(ChemdocsError::not_found(format!("Generated {} for document set {}", kind, document_set.id)));

    if !document_set.is_generated() {
        return Err(not_found());
    }
    let path = document_set.generated_path(kind).ok_or_else(not_found)?;
    if !state.storage.exists(path).await {
        tracing::warn!(document_set_id = document_set.id, path = %path, "Generated file missing on disk");
        return Err(not_found());
    }

    Ok(state.storage.read(path).await?)
}

async fn document_set_response(
    state: &AppState,
    document_set: DocumentSet,
    reused: bool,
) -> ApiResult<DocumentSetResponse> {
    let test_results = TestResultRepository::new(state.pool.clone())
        .find_by_document_set(document_set.id)
        .await?;

    let downloads = if document_set.is_generated() {
        DocumentKind::ALL
            .into_iter()
            .map(|kind| DownloadLink {
                document_type: kind,
                title: kind.title(),
                url: format!("/api/v1/document-sets/{}/documents/{}", document_set.id, kind.as_str()),
            })
            .collect()
    } else {
        Vec::new()
    };

    Ok(DocumentSetResponse {
        document_set,
        test_results,
        reused,
        downloads,
    })
}

fn attachment(data: Vec<u8>, content_type: &'static str, file_name: &str) -> ApiResult<Response> {
    let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{}\"", file_name))
        .map_err(|e| ChemdocsError::internal(e.to_string()))?;

    let mut response = Body::from(data).into_response();
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    headers.insert(header::CONTENT_DISPOSITION, disposition);
    Ok(response)
}

fn multipart_error(error: MultipartError, max_file_size: u64) -> ChemdocsError {
    if error.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ChemdocsError::payload_too_large(format!(
            "File is too large. Maximum size is {}MB.",
            max_file_size / (1024 * 1024)
        ))
    } else {
        ChemdocsError::validation("multipart", error.body_text())
    }
}
