use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Clone, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    Local,
    Memory,
    S3,
}

fn default_storage_kind() -> StorageKind {
    StorageKind::S3
}

/// What the ingestion trigger does when the backend refuses a start because a job is
/// already running for the data source.
#[derive(Clone, Copy, Deserialize, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConflictPolicy {
    /// Report the refusal as a benign, coalesced trigger.
    #[default]
    Coalesce,
    /// Report the refusal as an upstream failure.
    Surface,
}

/// How calls to the knowledge base service are authenticated.
#[derive(Clone, Copy, Deserialize, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BackendAuthMode {
    /// SigV4 signing with credentials from the ambient AWS chain.
    #[default]
    Sigv4,
    /// A bearer `backend_api_key` on every request.
    Bearer,
    /// Unsigned requests to a signing proxy behind the configured endpoints.
    Proxy,
}

#[derive(Clone, Deserialize, Debug)]
pub struct AppConfig {
    pub http_port: u16,
    pub knowledge_base_id: String,
    pub data_source_id: String,
    #[serde(default = "default_storage_kind")]
    pub storage: StorageKind,
    #[serde(default = "default_s3_bucket")]
    pub s3_bucket: String,
    #[serde(default = "default_aws_region")]
    pub aws_region: String,
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default = "default_model_arn")]
    pub model_arn: String,
    #[serde(default)]
    pub runtime_endpoint: Option<String>,
    #[serde(default)]
    pub agent_endpoint: Option<String>,
    #[serde(default)]
    pub backend_auth: BackendAuthMode,
    #[serde(default)]
    pub backend_api_key: Option<String>,
    #[serde(default = "default_query_timeout_secs")]
    pub query_timeout_secs: u64,
    #[serde(default = "default_ingestion_timeout_secs")]
    pub ingestion_timeout_secs: u64,
    #[serde(default = "default_ingestion_dedup_window_secs")]
    pub ingestion_dedup_window_secs: u64,
    #[serde(default)]
    pub ingestion_conflict_policy: ConflictPolicy,
    #[serde(default = "default_upload_max_body_bytes")]
    pub upload_max_body_bytes: usize,
}

impl AppConfig {
    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs)
    }

    pub fn ingestion_timeout(&self) -> Duration {
        Duration::from_secs(self.ingestion_timeout_secs)
    }

    /// Coalescing window for ingestion idempotency tokens, never shorter than a second.
    pub fn ingestion_dedup_window(&self) -> Duration {
        Duration::from_secs(self.ingestion_dedup_window_secs.max(1))
    }

    pub fn resolved_runtime_endpoint(&self) -> String {
        self.runtime_endpoint.clone().unwrap_or_else(|| {
            format!("https://bedrock-agent-runtime.{}.amazonaws.com", self.aws_region)
        })
    }

    pub fn resolved_agent_endpoint(&self) -> String {
        self.agent_endpoint
            .clone()
            .unwrap_or_else(|| format!("https://bedrock-agent.{}.amazonaws.com", self.aws_region))
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            http_port: 0,
            knowledge_base_id: String::new(),
            data_source_id: String::new(),
            storage: default_storage_kind(),
            s3_bucket: default_s3_bucket(),
            aws_region: default_aws_region(),
            data_dir: default_data_dir(),
            model_arn: default_model_arn(),
            runtime_endpoint: None,
            agent_endpoint: None,
            backend_auth: BackendAuthMode::default(),
            backend_api_key: None,
            query_timeout_secs: default_query_timeout_secs(),
            ingestion_timeout_secs: default_ingestion_timeout_secs(),
            ingestion_dedup_window_secs: default_ingestion_dedup_window_secs(),
            ingestion_conflict_policy: ConflictPolicy::default(),
            upload_max_body_bytes: default_upload_max_body_bytes(),
        }
    }
}

fn default_s3_bucket() -> String {
    "bedrock-kb-documents".to_string()
}

fn default_aws_region() -> String {
    "us-east-1".to_string()
}

fn default_data_dir() -> String {
    "./data".to_string()
}

fn default_model_arn() -> String {
    "arn:aws:bedrock:us-east-1::foundation-model/anthropic.claude-3-5-sonnet-20241022-v2:0"
        .to_string()
}

fn default_query_timeout_secs() -> u64 {
    30
}

fn default_ingestion_timeout_secs() -> u64 {
    10
}

fn default_ingestion_dedup_window_secs() -> u64 {
    60
}

fn default_upload_max_body_bytes() -> usize {
    50 * 1024 * 1024
}

pub fn get_config() -> Result<AppConfig, ConfigError> {
    let config = Config::builder()
        .add_source(File::with_name("config").required(false))
        .add_source(Environment::default())
        .build()?;

    config.try_deserialize()
}
