use api_state::ApiState;
use axum::{
    extract::{DefaultBodyLimit, FromRef},
    routing::{get, post},
    Router,
};
use routes::{
    documents::{derive_document_key, list_documents},
    liveness::live,
    prompt::prompt,
    readiness::ready,
    sync::sync_knowledge_base,
    upload::upload_document,
};

pub mod api_state;
pub mod error;
mod routes;

/// Router for the knowledge base API.
pub fn api_routes<S>(app_state: &ApiState) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
    ApiState: FromRef<S>,
{
    // Health checks
    let health = Router::new()
        .route("/ready", get(ready))
        .route("/live", get(live));

    let knowledge_base = Router::new()
        .route("/prompt", post(prompt))
        .route("/sync-kb", post(sync_knowledge_base));

    let documents = Router::new()
        .route(
            "/upload",
            post(upload_document).layer(DefaultBodyLimit::max(
                app_state.config.upload_max_body_bytes,
            )),
        )
        .route("/documents", get(list_documents))
        .route("/documents/key", post(derive_document_key));

    health.merge(knowledge_base).merge(documents)
}
