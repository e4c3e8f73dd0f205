use axum::{
    body::Bytes,
    extract::{Query, State},
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use common::{
    error::AppError,
    storage::types::{
        document_metadata::DocumentMetadata, storage_key::StorageKey, tag_set::TagSet,
    },
};
use serde::{Deserialize, Serialize};

use crate::{api_state::ApiState, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub prefix: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DocumentSummary {
    key: String,
    size: u64,
    last_modified: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
struct DerivedKey {
    key: StorageKey,
    tags: TagSet,
}

/// Lists stored documents, optionally below a key prefix such as `federal` or
/// `states/ohio`.
pub async fn list_documents(
    State(state): State<ApiState>,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, ApiError> {
    let prefix = params
        .prefix
        .as_deref()
        .map(|p| p.trim().trim_matches('/'))
        .filter(|p| !p.is_empty());

    let objects = state.storage.list(prefix).await.map_err(AppError::from)?;
    let documents: Vec<DocumentSummary> = objects
        .into_iter()
        .map(|meta| DocumentSummary {
            key: meta.location.to_string(),
            size: u64::try_from(meta.size).unwrap_or(u64::MAX),
            last_modified: meta.last_modified,
        })
        .collect();

    Ok(Json(serde_json::json!({ "documents": documents })))
}

/// Derives the storage key and tag string a document would be uploaded with today.
pub async fn derive_document_key(body: Bytes) -> Result<impl IntoResponse, ApiError> {
    let raw = std::str::from_utf8(&body)
        .map_err(|_| ApiError::ValidationError("Request body must be UTF-8 JSON".to_string()))?;
    if raw.trim().is_empty() {
        return Err(ApiError::ValidationError(
            "Request body is required".to_string(),
        ));
    }

    let metadata = DocumentMetadata::parse_json(raw)?;

    Ok(Json(DerivedKey {
        key: StorageKey::derive_today(&metadata),
        tags: TagSet::for_document(&metadata),
    }))
}
