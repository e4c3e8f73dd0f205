use std::sync::Arc;

use common::{
    knowledge_base::KnowledgeBaseBackend, storage::store::StorageManager,
    utils::config::AppConfig,
};
use ingestion_trigger::IngestionTrigger;
use retrieval_pipeline::AnswerRetriever;

#[derive(Clone)]
pub struct ApiState {
    pub config: AppConfig,
    pub storage: StorageManager,
    pub answer_retriever: Arc<AnswerRetriever>,
    pub ingestion_trigger: Arc<IngestionTrigger>,
}

impl ApiState {
    /// Wires the request handlers to one shared backend client.
    pub fn new(
        config: &AppConfig,
        storage: StorageManager,
        backend: Arc<dyn KnowledgeBaseBackend>,
    ) -> Self {
        Self {
            config: config.clone(),
            storage,
            answer_retriever: Arc::new(AnswerRetriever::from_config(
                Arc::clone(&backend),
                config,
            )),
            ingestion_trigger: Arc::new(IngestionTrigger::from_config(backend, config)),
        }
    }
}
