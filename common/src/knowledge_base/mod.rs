//! Boundary to the managed retrieval/generation service.
//!
//! The service is a black box reached through two calls: a synchronous
//! retrieve-and-generate request and an asynchronous ingestion job start.

pub mod client;
#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::error::AppError;

pub use client::{BackendAuth, BedrockKnowledgeBaseClient};

/// A question to answer against a knowledge base.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrieveAndGenerateRequest {
    pub input_text: String,
    /// Continuation token from a previous answer, passed through unchanged.
    pub session_id: Option<String>,
    pub knowledge_base_id: String,
    pub model_arn: String,
}

/// Generated answer with the backend's session token and raw citation records.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedAnswer {
    pub text: String,
    pub session_id: String,
    pub citations: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartIngestionJobRequest {
    pub knowledge_base_id: String,
    pub data_source_id: String,
    /// Idempotency token; repeated starts with the same token map to one job.
    pub client_token: String,
    pub description: Option<String>,
}

/// Handle of an ingestion job the backend accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestionJob {
    pub ingestion_job_id: String,
    pub status: Option<String>,
}

#[async_trait]
pub trait KnowledgeBaseBackend: Send + Sync {
    async fn retrieve_and_generate(
        &self,
        request: RetrieveAndGenerateRequest,
    ) -> Result<GeneratedAnswer, AppError>;

    /// Starts a re-scan of the data source. A refusal because another job is
    /// running is reported as [`AppError::BackendConflict`].
    async fn start_ingestion_job(
        &self,
        request: StartIngestionJobRequest,
    ) -> Result<IngestionJob, AppError>;
}
