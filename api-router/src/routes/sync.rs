use axum::{body::Bytes, extract::State, response::IntoResponse, Json};
use ingestion_trigger::TriggerSource;
use serde_json::json;
use tracing::info;

use crate::{api_state::ApiState, error::ApiError};

/// Starts a knowledge base re-index. The body is an optional object change
/// notification; without one the sync is treated as manual.
pub async fn sync_knowledge_base(
    State(state): State<ApiState>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let source = TriggerSource::from_body(&body)?;
    if let TriggerSource::ObjectChanges(events) = &source {
        info!(change_count = events.len(), "Received object change notification");
    }

    let outcome = state.ingestion_trigger.trigger(source).await?;

    Ok(Json(json!({
        "ingestionJobId": outcome.ingestion_job_id(),
        "status": outcome.status(),
    })))
}
