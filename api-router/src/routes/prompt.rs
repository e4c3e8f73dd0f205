use axum::{body::Bytes, extract::State, response::IntoResponse, Json};
use retrieval_pipeline::PromptRequest;

use crate::{api_state::ApiState, error::ApiError};

/// Answers a question against the knowledge base, continuing the caller's
/// session when one is supplied.
pub async fn prompt(
    State(state): State<ApiState>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let prompt = PromptRequest::from_slice(&body)?;
    let answer = state.answer_retriever.answer(prompt).await?;

    Ok(Json(answer))
}
