use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use object_store::{
    aws::{AmazonS3Builder, AwsAuthorizer, AwsCredentialProvider},
    CredentialProvider,
};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use super::{
    GeneratedAnswer, IngestionJob, KnowledgeBaseBackend, RetrieveAndGenerateRequest,
    StartIngestionJobRequest,
};
use crate::{
    error::AppError,
    utils::config::{AppConfig, BackendAuthMode},
};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const ERROR_TYPE_HEADER: &str = "x-amzn-errortype";
const KNOWLEDGE_BASE_CONFIGURATION_TYPE: &str = "KNOWLEDGE_BASE";
const SIGNING_SERVICE: &str = "bedrock";

/// Request authentication for the knowledge base service.
pub enum BackendAuth {
    /// SigV4 signatures from a credential provider.
    SigV4 {
        credentials: AwsCredentialProvider,
        region: String,
    },
    Bearer(String),
    /// Requests go out unsigned to a signing proxy.
    Unsigned,
}

impl BackendAuth {
    /// Resolves the configured mode. SigV4 uses the same environment, profile and
    /// instance-metadata credential chain as the S3 storage backend.
    pub fn from_config(cfg: &AppConfig) -> Result<Self, AppError> {
        match cfg.backend_auth {
            BackendAuthMode::Sigv4 => {
                let s3 = AmazonS3Builder::from_env()
                    .with_bucket_name(&cfg.s3_bucket)
                    .with_region(&cfg.aws_region)
                    .build()
                    .map_err(|e| {
                        AppError::InternalError(format!("Could not resolve AWS credentials: {e}"))
                    })?;
                Ok(Self::SigV4 {
                    credentials: Arc::clone(s3.credentials()),
                    region: cfg.aws_region.clone(),
                })
            }
            BackendAuthMode::Bearer => cfg
                .backend_api_key
                .clone()
                .filter(|key| !key.trim().is_empty())
                .map(Self::Bearer)
                .ok_or_else(|| {
                    AppError::InternalError(
                        "backend_api_key is required when backend_auth is bearer".to_string(),
                    )
                }),
            BackendAuthMode::Proxy => Ok(Self::Unsigned),
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Self::SigV4 { .. } => "sigv4",
            Self::Bearer(_) => "bearer",
            Self::Unsigned => "unsigned",
        }
    }
}

/// JSON-over-HTTPS client for the managed knowledge base service.
pub struct BedrockKnowledgeBaseClient {
    http: Client,
    runtime_endpoint: Url,
    agent_endpoint: Url,
    auth: BackendAuth,
}

impl BedrockKnowledgeBaseClient {
    pub fn new(
        runtime_endpoint: &str,
        agent_endpoint: &str,
        auth: BackendAuth,
    ) -> Result<Self, AppError> {
        let http = Client::builder().connect_timeout(CONNECT_TIMEOUT).build()?;

        Ok(Self {
            http,
            runtime_endpoint: parse_endpoint(runtime_endpoint)?,
            agent_endpoint: parse_endpoint(agent_endpoint)?,
            auth,
        })
    }

    pub fn from_config(cfg: &AppConfig) -> Result<Self, AppError> {
        Self::new(
            &cfg.resolved_runtime_endpoint(),
            &cfg.resolved_agent_endpoint(),
            BackendAuth::from_config(cfg)?,
        )
    }

    pub fn auth_mode(&self) -> &'static str {
        self.auth.label()
    }

    /// Authenticates and sends a fully built request.
    async fn send(&self, builder: RequestBuilder) -> Result<Response, AppError> {
        let builder = match &self.auth {
            BackendAuth::Bearer(key) => builder.bearer_auth(key),
            BackendAuth::SigV4 { .. } | BackendAuth::Unsigned => builder,
        };
        let mut request = builder.build()?;

        if let BackendAuth::SigV4 {
            credentials,
            region,
        } = &self.auth
        {
            let credential = credentials.get_credential().await.map_err(|e| {
                AppError::UpstreamBackend(format!("Could not load AWS credentials: {e}"))
            })?;
            AwsAuthorizer::new(&credential, SIGNING_SERVICE, region).authorize(&mut request, None);
        }

        Ok(self.http.execute(request).await?)
    }
}

fn parse_endpoint(raw: &str) -> Result<Url, AppError> {
    Url::parse(raw)
        .map_err(|e| AppError::InternalError(format!("Invalid backend endpoint '{raw}': {e}")))
}

/// Appends percent-encoded path segments to an endpoint.
fn endpoint_url(base: &Url, segments: &[&str]) -> Result<Url, AppError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|()| AppError::InternalError(format!("Endpoint '{base}' cannot take a path")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RetrieveAndGenerateBody<'a> {
    input: TextInput<'a>,
    retrieve_and_generate_configuration: RetrieveAndGenerateConfiguration<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    session_id: Option<&'a str>,
}

#[derive(Serialize)]
struct TextInput<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RetrieveAndGenerateConfiguration<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    knowledge_base_configuration: KnowledgeBaseConfiguration<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct KnowledgeBaseConfiguration<'a> {
    knowledge_base_id: &'a str,
    model_arn: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RetrieveAndGenerateReply {
    output: GeneratedOutput,
    session_id: String,
    #[serde(default)]
    citations: Option<Vec<Value>>,
}

#[derive(Deserialize)]
struct GeneratedOutput {
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StartIngestionJobBody<'a> {
    client_token: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StartIngestionJobReply {
    ingestion_job: IngestionJobSummary,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct IngestionJobSummary {
    ingestion_job_id: String,
    #[serde(default)]
    status: Option<String>,
}

#[derive(Deserialize, Default)]
struct BackendErrorBody {
    #[serde(alias = "Message")]
    message: Option<String>,
}

async fn read_json<T: DeserializeOwned>(response: Response, operation: &str) -> Result<T, AppError> {
    if response.status().is_success() {
        return response.json::<T>().await.map_err(|e| {
            AppError::UpstreamBackend(format!("{operation} returned a malformed response: {e}"))
        });
    }
    Err(error_from_response(response, operation).await)
}

async fn error_from_response(response: Response, operation: &str) -> AppError {
    let status = response.status();
    let error_type = response
        .headers()
        .get(ERROR_TYPE_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(':').next())
        .unwrap_or("unknown")
        .to_string();
    let body = response
        .json::<BackendErrorBody>()
        .await
        .unwrap_or_default();
    let message = body
        .message
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("no message").to_string());

    warn!(
        operation,
        %status,
        %error_type,
        %message,
        "Backend rejected request"
    );

    if status == StatusCode::CONFLICT {
        AppError::BackendConflict(message)
    } else {
        AppError::UpstreamBackend(format!("{operation} failed with {status}: {message}"))
    }
}

#[async_trait]
impl KnowledgeBaseBackend for BedrockKnowledgeBaseClient {
    async fn retrieve_and_generate(
        &self,
        request: RetrieveAndGenerateRequest,
    ) -> Result<GeneratedAnswer, AppError> {
        let url = endpoint_url(&self.runtime_endpoint, &["retrieveAndGenerate"])?;
        let body = RetrieveAndGenerateBody {
            input: TextInput {
                text: &request.input_text,
            },
            retrieve_and_generate_configuration: RetrieveAndGenerateConfiguration {
                kind: KNOWLEDGE_BASE_CONFIGURATION_TYPE,
                knowledge_base_configuration: KnowledgeBaseConfiguration {
                    knowledge_base_id: &request.knowledge_base_id,
                    model_arn: &request.model_arn,
                },
            },
            session_id: request.session_id.as_deref(),
        };

        debug!(%url, continues_session = request.session_id.is_some(), "Calling retrieveAndGenerate");
        let response = self.send(self.http.post(url).json(&body)).await?;
        let reply: RetrieveAndGenerateReply = read_json(response, "retrieveAndGenerate").await?;

        Ok(GeneratedAnswer {
            text: reply.output.text,
            session_id: reply.session_id,
            citations: reply.citations.unwrap_or_default(),
        })
    }

    async fn start_ingestion_job(
        &self,
        request: StartIngestionJobRequest,
    ) -> Result<IngestionJob, AppError> {
        let url = endpoint_url(
            &self.agent_endpoint,
            &[
                "knowledgebases",
                &request.knowledge_base_id,
                "datasources",
                &request.data_source_id,
                "ingestionjobs",
                "",
            ],
        )?;
        let body = StartIngestionJobBody {
            client_token: &request.client_token,
            description: request.description.as_deref(),
        };

        debug!(%url, client_token = %request.client_token, "Calling startIngestionJob");
        let response = self.send(self.http.put(url).json(&body)).await?;
        let reply: StartIngestionJobReply = read_json(response, "startIngestionJob").await?;

        Ok(IngestionJob {
            ingestion_job_id: reply.ingestion_job.ingestion_job_id,
            status: reply.ingestion_job.status,
        })
    }
}
