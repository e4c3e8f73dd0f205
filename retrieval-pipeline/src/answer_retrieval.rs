use std::sync::Arc;
use std::time::Duration;

use common::{
    error::AppError,
    knowledge_base::{GeneratedAnswer, KnowledgeBaseBackend, RetrieveAndGenerateRequest},
    utils::config::AppConfig,
};
use tracing::{debug, error, instrument};

use crate::prompt::ValidatedPrompt;

/// Conversational question answering against the knowledge base.
///
/// Holds no session state: the session token travels with each request and
/// answer.
pub struct AnswerRetriever {
    backend: Arc<dyn KnowledgeBaseBackend>,
    knowledge_base_id: String,
    model_arn: String,
    timeout: Duration,
}

impl AnswerRetriever {
    pub fn from_config(backend: Arc<dyn KnowledgeBaseBackend>, cfg: &AppConfig) -> Self {
        Self {
            backend,
            knowledge_base_id: cfg.knowledge_base_id.clone(),
            model_arn: cfg.model_arn.clone(),
            timeout: cfg.query_timeout(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[instrument(skip_all, fields(continues_session = prompt.session_id.is_some()))]
    pub async fn answer(&self, prompt: ValidatedPrompt) -> Result<GeneratedAnswer, AppError> {
        let request = RetrieveAndGenerateRequest {
            input_text: prompt.question,
            session_id: prompt.session_id,
            knowledge_base_id: self.knowledge_base_id.clone(),
            model_arn: self.model_arn.clone(),
        };

        let answer = tokio::time::timeout(self.timeout, self.backend.retrieve_and_generate(request))
            .await
            .map_err(|_| {
                error!(timeout = ?self.timeout, "Knowledge base query timed out");
                AppError::BackendTimeout(self.timeout)
            })?
            .inspect_err(|err| error!(error = %err, "Knowledge base query failed"))?;

        debug!(
            session_id = %answer.session_id,
            citations = answer.citations.len(),
            "Knowledge base answered"
        );
        Ok(answer)
    }
}
