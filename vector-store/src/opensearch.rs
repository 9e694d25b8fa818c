//! OpenSearch-compatible REST client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use rag_embeddings::EMBEDDING_DIMENSION;

use crate::document::{Document, IndexSchema, SearchRequest};
use crate::error::{Result, VectorStoreError};
use crate::{DEFAULT_INDEX_NAME, VectorIndex};

/// Connection settings for [`OpenSearchClient`].
#[derive(Debug, Clone)]
pub struct OpenSearchConfig {
    /// Cluster endpoint. A bare host gets an `https://` scheme.
    pub endpoint: String,

    /// Index holding the documents.
    pub index_name: String,

    /// Declared vector dimension.
    pub dimension: usize,

    /// Basic auth username.
    pub username: Option<String>,

    /// Basic auth password.
    pub password: Option<String>,

    /// Per-request timeout.
    pub timeout: Duration,
}

impl OpenSearchConfig {
    /// Create a configuration for `endpoint` with default index settings.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            index_name: DEFAULT_INDEX_NAME.to_string(),
            dimension: EMBEDDING_DIMENSION,
            username: None,
            password: None,
            timeout: Duration::from_secs(300),
        }
    }

    /// Set the index name.
    pub fn with_index_name(mut self, index_name: impl Into<String>) -> Self {
        self.index_name = index_name.into();
        self
    }

    /// Set basic auth credentials.
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn base_url(&self) -> String {
        let endpoint = self.endpoint.trim_end_matches('/');
        if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            endpoint.to_string()
        } else {
            format!("https://{endpoint}")
        }
    }
}

/// Client for a single index on an OpenSearch-compatible cluster.
pub struct OpenSearchClient {
    client: reqwest::Client,
    base_url: String,
    config: OpenSearchConfig,
}

impl OpenSearchClient {
    /// Build a client. No request is made until an operation runs.
    pub fn new(config: OpenSearchConfig) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        let base_url = config.base_url();

        info!(
            "OpenSearch client for index {} at {base_url}",
            config.index_name
        );

        Ok(Self {
            client,
            base_url,
            config,
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}/{}{path}", self.base_url, self.config.index_name);
        let builder = self.client.request(method, url);
        match &self.config.username {
            Some(username) => builder.basic_auth(username, self.config.password.as_ref()),
            None => builder,
        }
    }
}

#[async_trait]
impl VectorIndex for OpenSearchClient {
    fn index_name(&self) -> &str {
        &self.config.index_name
    }

    fn dimension(&self) -> usize {
        self.config.dimension
    }

    async fn exists(&self) -> Result<bool> {
        let response = self.request(Method::HEAD, "").send().await?;
        match response.status() {
            StatusCode::OK => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => Err(VectorStoreError::Request {
                status: status.as_u16(),
                reason: format!("unexpected status checking index {}", self.config.index_name),
            }),
        }
    }

    async fn create_index(&self) -> Result<()> {
        let body = IndexSchema::new(self.config.dimension).to_body();
        let response = self.request(Method::PUT, "").json(&body).send().await?;
        let status = response.status();

        if status.is_success() {
            info!("Created index {}", self.config.index_name);
            return Ok(());
        }

        let error = ErrorBody::read(response).await;
        if status == StatusCode::BAD_REQUEST && error.kind == "resource_already_exists_exception" {
            debug!("Index {} already exists", self.config.index_name);
            return Ok(());
        }

        Err(VectorStoreError::Request {
            status: status.as_u16(),
            reason: error.reason,
        })
    }

    async fn add_document(&self, document: Document) -> Result<()> {
        let response = self
            .request(Method::POST, "/_doc")
            // Visible to the next search without waiting out the refresh interval.
            .query(&[("refresh", "wait_for")])
            .json(&document)
            .send()
            .await?;

        if response.status().is_success() {
            debug!("Indexed document into {}", self.config.index_name);
            return Ok(());
        }

        let error = ErrorBody::read(response).await;
        warn!("Index write rejected: {}", error.reason);
        Err(VectorStoreError::Indexing(error.reason))
    }

    async fn search(&self, vector: &[f32], k: usize) -> Result<Vec<String>> {
        let body = SearchRequest { vector, k }.to_body();
        let response = self
            .request(Method::POST, "/_search")
            .json(&body)
            .send()
            .await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Err(VectorStoreError::IndexAbsent(self.config.index_name.clone()));
        }
        if !status.is_success() {
            let error = ErrorBody::read(response).await;
            if error.kind == "index_not_found_exception" {
                return Err(VectorStoreError::IndexAbsent(self.config.index_name.clone()));
            }
            return Err(VectorStoreError::Request {
                status: status.as_u16(),
                reason: error.reason,
            });
        }

        let result: SearchResponse = response.json().await?;
        let texts = result.texts()?;
        debug!("Search returned {} hits", texts.len());
        Ok(texts)
    }

    async fn delete_index(&self) -> Result<()> {
        let response = self.request(Method::DELETE, "").send().await?;

        if response.status().is_success() {
            info!("Deleted index {}", self.config.index_name);
            return Ok(());
        }

        let error = ErrorBody::read(response).await;
        warn!("Index deletion rejected: {}", error.reason);
        Err(VectorStoreError::Deletion(error.reason))
    }
}

/// The interesting parts of an error response.
struct ErrorBody {
    kind: String,
    reason: String,
}

impl ErrorBody {
    async fn read(response: Response) -> Self {
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        Self::parse(status, &text)
    }

    /// Pull `error.type` and `error.reason` out of the body, falling back to
    /// the raw text.
    fn parse(status: StatusCode, text: &str) -> Self {
        let value: Value = serde_json::from_str(text).unwrap_or(Value::Null);
        let error = &value["error"];

        let kind = error["type"].as_str().unwrap_or_default().to_string();
        let reason = error["reason"]
            .as_str()
            .or_else(|| error.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| {
                if text.is_empty() {
                    status.to_string()
                } else {
                    text.to_string()
                }
            });

        Self { kind, reason }
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    hits: Hits,
}

#[derive(Debug, Deserialize)]
struct Hits {
    hits: Vec<Hit>,
}

#[derive(Debug, Deserialize)]
struct Hit {
    #[serde(default)]
    fields: Option<HitFields>,
}

#[derive(Debug, Deserialize)]
struct HitFields {
    #[serde(default)]
    text: Vec<String>,
}

impl SearchResponse {
    fn texts(self) -> Result<Vec<String>> {
        self.hits
            .hits
            .into_iter()
            .map(|hit| {
                hit.fields
                    .and_then(|f| f.text.into_iter().next())
                    .ok_or_else(|| {
                        VectorStoreError::InvalidResponse("hit without a text field".to_string())
                    })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const INDEX: &str = "test-index";

    fn client_for(server: &MockServer) -> OpenSearchClient {
        OpenSearchClient::new(
            OpenSearchConfig::new(server.uri())
                .with_index_name(INDEX)
                .with_timeout(Duration::from_secs(5)),
        )
        .unwrap()
    }

    fn rejection(kind: &str, reason: &str, status: u16) -> ResponseTemplate {
        ResponseTemplate::new(status).set_body_json(json!({
            "error": {"type": kind, "reason": reason},
            "status": status,
        }))
    }

    #[test]
    fn test_bare_host_gets_https() {
        let config = OpenSearchConfig::new("search.example.com:443/");
        assert_eq!(config.base_url(), "https://search.example.com:443");
    }

    #[test]
    fn test_error_body_falls_back_to_text() {
        let error = ErrorBody::parse(StatusCode::BAD_GATEWAY, "upstream down");
        assert_eq!(error.reason, "upstream down");
        assert_eq!(error.kind, "");
    }

    #[tokio::test]
    async fn test_ensure_index_creates_missing_index() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path(format!("/{INDEX}")))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path(format!("/{INDEX}")))
            .and(body_partial_json(json!({"settings": {"index": {"knn": true}}})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"acknowledged": true})))
            .expect(1)
            .mount(&server)
            .await;

        client_for(&server).ensure_index().await.unwrap();
    }

    #[tokio::test]
    async fn test_ensure_index_skips_existing_index() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path(format!("/{INDEX}")))
            .respond_with(ResponseTemplate::new(200))
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = client_for(&server);
        client.ensure_index().await.unwrap();
        client.ensure_index().await.unwrap();
    }

    #[tokio::test]
    async fn test_create_tolerates_existing_index() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path(format!("/{INDEX}")))
            .respond_with(rejection(
                "resource_already_exists_exception",
                "index [test-index] already exists",
                400,
            ))
            .mount(&server)
            .await;

        client_for(&server).create_index().await.unwrap();
    }

    #[tokio::test]
    async fn test_rejected_write_carries_reason() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(format!("/{INDEX}/_doc")))
            .respond_with(rejection(
                "mapper_parsing_exception",
                "failed to parse field [embedding]",
                400,
            ))
            .mount(&server)
            .await;

        let result = client_for(&server)
            .insert(Document::new("bad", vec![1.0]))
            .await;

        match result {
            Err(VectorStoreError::Indexing(reason)) => {
                assert_eq!(reason, "failed to parse field [embedding]");
            }
            other => panic!("expected indexing error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_write_waits_for_refresh() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(format!("/{INDEX}/_doc")))
            .and(query_param("refresh", "wait_for"))
            .and(body_partial_json(json!({"text": "cats are mammals"})))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"result": "created"})))
            .expect(1)
            .mount(&server)
            .await;

        client_for(&server)
            .add_document(Document::new("cats are mammals", vec![1.0, 0.0]))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_search_returns_texts_in_rank_order() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(format!("/{INDEX}/_search")))
            .and(body_partial_json(json!({"size": 2, "_source": false})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "hits": {
                    "total": {"value": 2},
                    "hits": [
                        {"_id": "1", "_score": 0.9, "fields": {"text": ["cats are mammals"]}},
                        {"_id": "2", "_score": 0.4, "fields": {"text": ["dogs bark"]}}
                    ]
                }
            })))
            .mount(&server)
            .await;

        let texts = client_for(&server).search(&[0.1, 0.2], 2).await.unwrap();
        assert_eq!(texts, vec!["cats are mammals", "dogs bark"]);
    }

    #[tokio::test]
    async fn test_search_missing_index() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(format!("/{INDEX}/_search")))
            .respond_with(rejection(
                "index_not_found_exception",
                "no such index [test-index]",
                404,
            ))
            .mount(&server)
            .await;

        let result = client_for(&server).search(&[0.1], 2).await;
        assert!(matches!(result, Err(VectorStoreError::IndexAbsent(_))));
    }

    #[tokio::test]
    async fn test_delete_missing_index() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path(format!("/{INDEX}")))
            .respond_with(rejection(
                "index_not_found_exception",
                "no such index [test-index]",
                404,
            ))
            .mount(&server)
            .await;

        let result = client_for(&server).delete_index().await;
        match result {
            Err(VectorStoreError::Deletion(reason)) => {
                assert_eq!(reason, "no such index [test-index]");
            }
            other => panic!("expected deletion error, got {other:?}"),
        }
    }
}
