use axum::{body::Bytes, extract::State, http::StatusCode, response::IntoResponse, Json};
use axum_typed_multipart::{FieldData, TryFromMultipart, TypedMultipart, TypedMultipartError};
use chrono::Utc;
use common::storage::types::{
    document_metadata::{DocumentMetadata, UploadDetails},
    storage_key::StorageKey,
    tag_set::TagSet,
};
use serde_json::json;
use tracing::{error, info};

use crate::{api_state::ApiState, error::ApiError};

/// Upload form. Every field is optional here so that a missing one is reported
/// as a validation error by name; the body size is bounded by the route layer.
#[derive(Debug, TryFromMultipart)]
pub struct UploadParams {
    #[form_data(limit = "unlimited")]
    pub file: Option<FieldData<Bytes>>,
    pub key: Option<String>,
    pub metadata: Option<String>,
}

fn required_text(value: Option<String>, field: &str) -> Result<String, ApiError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ApiError::ValidationError(format!("{field} is required")))
}

pub async fn upload_document(
    State(state): State<ApiState>,
    form: Result<TypedMultipart<UploadParams>, TypedMultipartError>,
) -> Result<impl IntoResponse, ApiError> {
    let TypedMultipart(input) = form?;

    let file = input
        .file
        .ok_or_else(|| ApiError::ValidationError("file is required".to_string()))?;
    let key = StorageKey::parse(&required_text(input.key, "key")?)?;
    let raw_metadata = required_text(input.metadata, "metadata")?;

    let details = UploadDetails {
        file_name: file.metadata.file_name.clone(),
        content_type: file.metadata.content_type.clone(),
        size: u64::try_from(file.contents.len()).unwrap_or(u64::MAX),
        received_at: Utc::now(),
    };
    let metadata =
        DocumentMetadata::parse_json(&raw_metadata)?.with_upload_details(details, key.as_str());
    let tags = TagSet::for_document(&metadata);

    info!(
        key = %key,
        bytes = file.contents.len(),
        jurisdiction = %metadata.jurisdiction,
        document_type = %metadata.document_type,
        "Received document upload"
    );

    state
        .storage
        .put_document(&key, file.contents, &metadata, &tags)
        .await
        .map_err(|e| {
            error!(key = %key, error = %e, "Failed to store uploaded document");
            ApiError::UploadFailed("The document could not be stored".to_string())
        })?;

    Ok((
        StatusCode::OK,
        Json(json!({
            "success": true,
            "message": "Document uploaded successfully",
            "s3Key": key,
            "metadata": metadata,
        })),
    ))
}
