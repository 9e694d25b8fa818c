//! Generation clients.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::dialog::{BatchItem, Generation, GenerationRequest};
use crate::error::{GenerationError, Result};

/// Trait for text-generation backends.
#[async_trait]
pub trait GenerationClient: Send + Sync {
    /// Identifier of the backing endpoint.
    fn name(&self) -> &str;

    /// Run one generation. No retries: failures go straight to the caller.
    async fn generate(&self, request: &GenerationRequest) -> Result<Generation>;
}

/// Settings for [`EndpointClient`].
#[derive(Debug, Clone)]
pub struct EndpointConfig {
    /// Either a full `http(s)://` invocation URL or a hosted endpoint name.
    pub endpoint: String,

    /// Region used to build the URL for a hosted endpoint name.
    pub region: String,

    /// Optional bearer token.
    pub api_key: Option<String>,

    /// Per-request timeout. Large-model inference is slow.
    pub timeout: Duration,
}

impl EndpointConfig {
    /// Create a configuration for `endpoint` in `region`.
    pub fn new(endpoint: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            region: region.into(),
            api_key: None,
            timeout: Duration::from_secs(300),
        }
    }

    /// Set the bearer token.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// URL the payload is posted to.
    pub fn invocation_url(&self) -> Result<String> {
        let endpoint = self.endpoint.trim();
        if endpoint.is_empty() {
            return Err(GenerationError::Config(
                "generation endpoint is empty".to_string(),
            ));
        }

        if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            return Ok(endpoint.to_string());
        }

        Ok(format!(
            "https://runtime.sagemaker.{}.amazonaws.com/endpoints/{endpoint}/invocations",
            self.region
        ))
    }
}

/// Client for a hosted chat endpoint that takes batched dialogs.
pub struct EndpointClient {
    client: reqwest::Client,
    url: String,
    config: EndpointConfig,
}

impl EndpointClient {
    /// Build a client. The URL is resolved once, up front.
    pub fn new(config: EndpointConfig) -> Result<Self> {
        let url = config.invocation_url()?;
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;

        info!("Generation endpoint {} at {url}", config.endpoint);

        Ok(Self {
            client,
            url,
            config,
        })
    }
}

#[async_trait]
impl GenerationClient for EndpointClient {
    fn name(&self) -> &str {
        &self.config.endpoint
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<Generation> {
        let body = serde_json::to_vec(&request.to_payload())?;
        debug!(
            "Invoking {} with {} turns, max_new_tokens={}",
            self.config.endpoint,
            request.dialog.len(),
            request.max_tokens
        );

        let mut builder = self
            .client
            .post(&self.url)
            .header("Content-Type", "application/json")
            .header("X-Amzn-SageMaker-Custom-Attributes", "accept_eula=true")
            .body(body);
        if let Some(api_key) = &self.config.api_key {
            builder = builder.bearer_auth(api_key);
        }

        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Generation endpoint returned {status}");
            return Err(GenerationError::Endpoint {
                status: status.as_u16(),
                body,
            });
        }

        let batch: Vec<BatchItem> = response.json().await?;
        let generation = batch
            .into_iter()
            .next()
            .map(|item| item.generation)
            .ok_or_else(|| GenerationError::InvalidResponse("empty generation batch".to_string()))?;

        info!(
            "Generated {} characters as {}",
            generation.content.len(),
            generation.role
        );
        Ok(generation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialog::{GenerationParameters, Turn};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request() -> GenerationRequest {
        GenerationRequest::new(
            vec![Turn::system("context"), Turn::user("are cats mammals ? ")],
            GenerationParameters::default(),
        )
    }

    fn client_for(server: &MockServer) -> EndpointClient {
        let config = EndpointConfig::new(format!("{}/invocations", server.uri()), "us-east-1")
            .with_timeout(Duration::from_secs(5));
        EndpointClient::new(config).unwrap()
    }

    #[test]
    fn test_endpoint_name_resolves_to_hosted_url() {
        let config = EndpointConfig::new("llama2-7b-endpoint", "eu-west-1");
        assert_eq!(
            config.invocation_url().unwrap(),
            "https://runtime.sagemaker.eu-west-1.amazonaws.com/endpoints/llama2-7b-endpoint/invocations"
        );
    }

    #[test]
    fn test_empty_endpoint_rejected() {
        let config = EndpointConfig::new("  ", "us-east-1");
        assert!(matches!(
            config.invocation_url(),
            Err(GenerationError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_generate_takes_first_result() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/invocations"))
            .and(header("X-Amzn-SageMaker-Custom-Attributes", "accept_eula=true"))
            .and(body_partial_json(json!({
                "parameters": {"max_new_tokens": 1000, "return_full_text": false}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"generation": {"role": "assistant", "content": "Yes, cats are mammals."}},
                {"generation": {"role": "assistant", "content": "ignored"}}
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let generation = client_for(&server).generate(&request()).await.unwrap();
        assert_eq!(generation.role, "assistant");
        assert_eq!(generation.content, "Yes, cats are mammals.");
    }

    #[tokio::test]
    async fn test_generate_sends_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("Authorization", "Bearer secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"generation": {"role": "assistant", "content": "ok"}}
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let config = EndpointConfig::new(format!("{}/invocations", server.uri()), "us-east-1")
            .with_api_key("secret");
        let client = EndpointClient::new(config).unwrap();
        client.generate(&request()).await.unwrap();
    }

    #[tokio::test]
    async fn test_empty_batch_is_invalid() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let result = client_for(&server).generate(&request()).await;
        assert!(matches!(result, Err(GenerationError::InvalidResponse(_))));
    }

    #[tokio::test]
    async fn test_endpoint_error_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(424).set_body_string("model error"))
            .expect(1)
            .mount(&server)
            .await;

        let result = client_for(&server).generate(&request()).await;
        match result {
            Err(GenerationError::Endpoint { status, body }) => {
                assert_eq!(status, 424);
                assert_eq!(body, "model error");
            }
            other => panic!("expected endpoint error, got {other:?}"),
        }
    }
}
