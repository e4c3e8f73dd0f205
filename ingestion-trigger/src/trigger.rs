use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use common::{
    error::AppError,
    knowledge_base::{IngestionJob, KnowledgeBaseBackend, StartIngestionJobRequest},
    utils::config::{AppConfig, ConflictPolicy},
};
use tracing::{error, info, instrument, warn, Span};
use uuid::Uuid;

use crate::event::{idempotency_token, ChangeEvent, ObjectChangeNotification};

const COALESCED_STATUS: &str = "COALESCED";
const DEFAULT_STARTED_STATUS: &str = "STARTING";

/// What caused a sync request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerSource {
    /// Direct invocation without a notification.
    Manual,
    ObjectChanges(Vec<ChangeEvent>),
}

impl TriggerSource {
    /// Reads an optional notification body. An empty body, or a notification
    /// with an empty `Records` list, is a manual trigger. Any other body must
    /// carry `Records`.
    pub fn from_body(body: &[u8]) -> Result<Self, AppError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::Manual);
        }

        let events = ObjectChangeNotification::from_slice(body)?.into_events()?;
        if events.is_empty() {
            Ok(Self::Manual)
        } else {
            Ok(Self::ObjectChanges(events))
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::ObjectChanges(_) => "object-change",
        }
    }

    fn description(&self) -> String {
        match self {
            Self::Manual => "Manual knowledge base sync".to_string(),
            Self::ObjectChanges(events) => {
                format!("Knowledge base sync for {} object change(s)", events.len())
            }
        }
    }
}

/// Result of a sync request that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    Started(IngestionJob),
    /// The backend refused because a job was already running; that job will
    /// pick up the change.
    Coalesced,
}

impl SyncOutcome {
    pub fn ingestion_job_id(&self) -> Option<&str> {
        match self {
            Self::Started(job) => Some(job.ingestion_job_id.as_str()),
            Self::Coalesced => None,
        }
    }

    pub fn status(&self) -> &str {
        match self {
            Self::Started(job) => job.status.as_deref().unwrap_or(DEFAULT_STARTED_STATUS),
            Self::Coalesced => COALESCED_STATUS,
        }
    }
}

/// Starts re-indexing jobs for the configured data source. Never retries.
pub struct IngestionTrigger {
    backend: Arc<dyn KnowledgeBaseBackend>,
    knowledge_base_id: String,
    data_source_id: String,
    timeout: Duration,
    dedup_window: Duration,
    conflict_policy: ConflictPolicy,
}

impl IngestionTrigger {
    pub fn from_config(backend: Arc<dyn KnowledgeBaseBackend>, cfg: &AppConfig) -> Self {
        Self {
            backend,
            knowledge_base_id: cfg.knowledge_base_id.clone(),
            data_source_id: cfg.data_source_id.clone(),
            timeout: cfg.ingestion_timeout(),
            dedup_window: cfg.ingestion_dedup_window(),
            conflict_policy: cfg.ingestion_conflict_policy,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn client_token(&self, source: &TriggerSource, now: DateTime<Utc>) -> String {
        match source {
            TriggerSource::Manual => format!("manual-{}", Uuid::new_v4()),
            TriggerSource::ObjectChanges(events) => {
                idempotency_token(events, now, self.dedup_window)
            }
        }
    }

    #[instrument(skip_all, fields(source = source.label(), client_token = tracing::field::Empty))]
    pub async fn trigger(&self, source: TriggerSource) -> Result<SyncOutcome, AppError> {
        let client_token = self.client_token(&source, Utc::now());
        Span::current().record("client_token", client_token.as_str());

        let request = StartIngestionJobRequest {
            knowledge_base_id: self.knowledge_base_id.clone(),
            data_source_id: self.data_source_id.clone(),
            client_token,
            description: Some(source.description()),
        };

        let started =
            tokio::time::timeout(self.timeout, self.backend.start_ingestion_job(request)).await;

        match started {
            Err(_) => {
                warn!(timeout = ?self.timeout, "Ingestion start timed out");
                Err(AppError::BackendTimeout(self.timeout))
            }
            Ok(Ok(job)) => {
                info!(ingestion_job_id = %job.ingestion_job_id, "Ingestion job started");
                Ok(SyncOutcome::Started(job))
            }
            Ok(Err(AppError::BackendConflict(message)))
                if self.conflict_policy == ConflictPolicy::Coalesce =>
            {
                info!(%message, "Ingestion already running; coalescing trigger");
                Ok(SyncOutcome::Coalesced)
            }
            Ok(Err(err)) => {
                error!(error = %err, "Failed to start ingestion job");
                Err(err)
            }
        }
    }
}
