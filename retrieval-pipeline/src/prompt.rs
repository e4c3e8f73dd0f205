use common::{error::AppError, storage::types::blank_as_none};
use serde::Deserialize;

/// Raw `/prompt` body, `{ input, sessionId? }`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptRequest {
    #[serde(default)]
    pub input: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub session_id: Option<String>,
}

/// A question that is safe to send to the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedPrompt {
    pub question: String,
    pub session_id: Option<String>,
}

impl PromptRequest {
    pub fn from_slice(body: &[u8]) -> Result<ValidatedPrompt, AppError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Err(AppError::Validation("Request body is required".into()));
        }

        let request: Self = serde_json::from_slice(body)
            .map_err(|e| AppError::Validation(format!("Invalid request body: {e}")))?;
        request.validate()
    }

    pub fn validate(self) -> Result<ValidatedPrompt, AppError> {
        let question = self
            .input
            .filter(|input| !input.trim().is_empty())
            .ok_or_else(|| AppError::Validation("input is required".into()))?;

        Ok(ValidatedPrompt {
            question,
            session_id: self.session_id,
        })
    }
}
