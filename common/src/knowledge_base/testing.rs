//! In-process stand-in for the knowledge base service.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Mutex,
};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use super::{
    GeneratedAnswer, IngestionJob, KnowledgeBaseBackend, RetrieveAndGenerateRequest,
    StartIngestionJobRequest,
};
use crate::error::AppError;

#[derive(Debug, Clone)]
pub enum QueryBehavior {
    Answer {
        text: String,
        citations: Vec<Value>,
    },
    Fail(String),
    Hang(Duration),
}

#[derive(Debug, Clone)]
pub enum IngestionBehavior {
    Start { status: Option<String> },
    Conflict,
    Fail(String),
    Hang(Duration),
}

/// Records every call and answers according to the configured behaviour.
///
/// Sessions are echoed back when supplied and issued as `session-N` otherwise.
pub struct MockKnowledgeBase {
    query: Mutex<QueryBehavior>,
    ingestion: Mutex<IngestionBehavior>,
    queries: Mutex<Vec<RetrieveAndGenerateRequest>>,
    ingestions: Mutex<Vec<StartIngestionJobRequest>>,
    sessions_issued: AtomicUsize,
}

impl Default for MockKnowledgeBase {
    fn default() -> Self {
        Self {
            query: Mutex::new(QueryBehavior::Answer {
                text: "Mock answer".into(),
                citations: Vec::new(),
            }),
            ingestion: Mutex::new(IngestionBehavior::Start {
                status: Some("STARTING".into()),
            }),
            queries: Mutex::new(Vec::new()),
            ingestions: Mutex::new(Vec::new()),
            sessions_issued: AtomicUsize::new(0),
        }
    }
}

impl MockKnowledgeBase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_query(self, behavior: QueryBehavior) -> Self {
        self.set_query(behavior);
        self
    }

    pub fn with_ingestion(self, behavior: IngestionBehavior) -> Self {
        self.set_ingestion(behavior);
        self
    }

    pub fn set_query(&self, behavior: QueryBehavior) {
        *self.query.lock().expect("mock lock poisoned") = behavior;
    }

    pub fn set_ingestion(&self, behavior: IngestionBehavior) {
        *self.ingestion.lock().expect("mock lock poisoned") = behavior;
    }

    pub fn queries(&self) -> Vec<RetrieveAndGenerateRequest> {
        self.queries.lock().expect("mock lock poisoned").clone()
    }

    pub fn ingestions(&self) -> Vec<StartIngestionJobRequest> {
        self.ingestions.lock().expect("mock lock poisoned").clone()
    }

    pub fn query_count(&self) -> usize {
        self.queries.lock().expect("mock lock poisoned").len()
    }

    pub fn ingestion_count(&self) -> usize {
        self.ingestions.lock().expect("mock lock poisoned").len()
    }
}

#[async_trait]
impl KnowledgeBaseBackend for MockKnowledgeBase {
    async fn retrieve_and_generate(
        &self,
        request: RetrieveAndGenerateRequest,
    ) -> Result<GeneratedAnswer, AppError> {
        let session_id = request.session_id.clone().unwrap_or_else(|| {
            let n = self.sessions_issued.fetch_add(1, Ordering::SeqCst) + 1;
            format!("session-{n}")
        });
        self.queries
            .lock()
            .expect("mock lock poisoned")
            .push(request);

        let behavior = self.query.lock().expect("mock lock poisoned").clone();
        match behavior {
            QueryBehavior::Answer { text, citations } => Ok(GeneratedAnswer {
                text,
                session_id,
                citations,
            }),
            QueryBehavior::Fail(message) => Err(AppError::UpstreamBackend(message)),
            QueryBehavior::Hang(duration) => {
                tokio::time::sleep(duration).await;
                Err(AppError::UpstreamBackend("mock hung past its deadline".into()))
            }
        }
    }

    async fn start_ingestion_job(
        &self,
        request: StartIngestionJobRequest,
    ) -> Result<IngestionJob, AppError> {
        let n = {
            let mut ingestions = self.ingestions.lock().expect("mock lock poisoned");
            ingestions.push(request);
            ingestions.len()
        };

        let behavior = self.ingestion.lock().expect("mock lock poisoned").clone();
        match behavior {
            IngestionBehavior::Start { status } => Ok(IngestionJob {
                ingestion_job_id: format!("JOB{n:07}"),
                status,
            }),
            IngestionBehavior::Conflict => Err(AppError::BackendConflict(
                "An ingestion job is already running".into(),
            )),
            IngestionBehavior::Fail(message) => Err(AppError::UpstreamBackend(message)),
            IngestionBehavior::Hang(duration) => {
                tokio::time::sleep(duration).await;
                Err(AppError::UpstreamBackend("mock hung past its deadline".into()))
            }
        }
    }
}
