use std::sync::Arc;

use api_router::{api_routes, api_state::ApiState};
use axum::Router;
use common::{
    knowledge_base::{BedrockKnowledgeBaseClient, KnowledgeBaseBackend},
    storage::store::StorageManager,
    utils::config::get_config,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Set up tracing
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .try_init()
        .ok();

    // Get config
    let config = get_config()?;

    // Create global storage manager
    let storage = StorageManager::new(&config).await?;
    info!(
        storage = ?storage.backend_kind(),
        bucket = %config.s3_bucket,
        "Object storage initialized"
    );

    let client = BedrockKnowledgeBaseClient::from_config(&config)?;
    info!(
        auth = client.auth_mode(),
        knowledge_base_id = %config.knowledge_base_id,
        data_source_id = %config.data_source_id,
        runtime_endpoint = %config.resolved_runtime_endpoint(),
        "Knowledge base client initialized"
    );
    let backend: Arc<dyn KnowledgeBaseBackend> = Arc::new(client);

    let api_state = ApiState::new(&config, storage, backend);
    let app = build_router(&api_state);

    info!("Starting server listening on 0.0.0.0:{}", config.http_port);
    let serve_address = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(serve_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn build_router(api_state: &ApiState) -> Router {
    Router::new()
        .merge(api_routes(api_state))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(api_state.clone())
}
