//! Request routing and the three operations.
//!
//! Each request goes `Routing -> {Ingesting | Deleting | Querying} ->
//! Responding`. The router holds no per-request state; the clients it owns
//! are built once at startup and only read afterwards.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, error, info, warn};

use rag_embeddings::{Embedder, SentenceEmbedder, SentenceEmbedderConfig};
use rag_generation::{
    EndpointClient, EndpointConfig, GenerationClient, GenerationParameters, GenerationRequest,
    Turn,
};
use rag_vector_store::{
    Document, MemoryIndex, OpenSearchClient, OpenSearchConfig, VectorIndex, VectorStoreError,
};

use crate::config::{AdvisoryPolicy, HandlerConfig};
use crate::error::{HandlerError, Result};
use crate::event::{Envelope, InboundEvent};
use crate::response::{self, OperationResult};
use crate::route::{Route, api_key};

/// Number of documents retrieved as context for a query.
pub const QUERY_TOP_K: usize = 2;

/// Error message for unmapped routes.
pub const API_NOT_SUPPORTED: &str = "api_not_supported";

/// Error message for unexpected failures.
pub const SYSTEM_EXCEPTION: &str = "system_exception";

/// Message returned when a query cannot be answered from the index.
pub const INDEX_ADVISORY: &str = "Vector Index does not exist. Please index some documents";

/// Which vector store backs the router.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexBackend {
    /// The configured search cluster.
    OpenSearch,
    /// An in-process index that lives as long as the process.
    InMemory,
}

/// Query-time settings.
#[derive(Debug, Clone)]
pub struct QuerySettings {
    /// Preamble for the system turn.
    pub system_prompt: String,

    /// Sampling parameters.
    pub parameters: GenerationParameters,

    /// How query failures are presented.
    pub advisory_policy: AdvisoryPolicy,
}

impl From<&HandlerConfig> for QuerySettings {
    fn from(config: &HandlerConfig) -> Self {
        Self {
            system_prompt: config.system_prompt.clone(),
            parameters: config.generation.parameters,
            advisory_policy: config.advisory_policy,
        }
    }
}

/// Typed result of the query pipeline, before presentation.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome {
    /// The model answered; one `{Role: content}` entry.
    Answer(Vec<Value>),
    /// The index does not exist.
    IndexAbsent,
    /// The index exists but returned no documents.
    NoDocuments,
}

#[derive(Debug, Deserialize)]
struct IngestBody {
    text: Option<String>,
}

/// Routes inbound events to ingest, delete or query.
pub struct RequestRouter {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    generator: Arc<dyn GenerationClient>,
    settings: QuerySettings,
}

impl RequestRouter {
    /// Create a router over already-built clients.
    pub fn new(
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
        generator: Arc<dyn GenerationClient>,
        settings: QuerySettings,
    ) -> Self {
        info!(
            "Request router: embedder={}, index={}, generator={}",
            embedder.name(),
            index.index_name(),
            generator.name()
        );
        if embedder.dimension() != index.dimension() {
            warn!(
                "embedder produces {} dims but index {} declares {}; writes will be rejected",
                embedder.dimension(),
                index.index_name(),
                index.dimension()
            );
        }

        Self {
            embedder,
            index,
            generator,
            settings,
        }
    }

    /// Build every client from configuration.
    ///
    /// Loading the embedding model is the slow part; do this once per
    /// process.
    pub fn from_config(config: &HandlerConfig, backend: IndexBackend) -> anyhow::Result<Self> {
        let embedder = SentenceEmbedder::load(SentenceEmbedderConfig::new(&config.model_path))?;
        let dimension = embedder.dimension();

        let index: Arc<dyn VectorIndex> = match backend {
            IndexBackend::OpenSearch => {
                let mut store = OpenSearchConfig::new(&config.store.endpoint)
                    .with_index_name(&config.store.index_name);
                store.dimension = dimension;
                if let Some(username) = &config.store.username {
                    store = store.with_credentials(
                        username,
                        config.store.password.clone().unwrap_or_default(),
                    );
                }
                Arc::new(OpenSearchClient::new(store)?)
            }
            IndexBackend::InMemory => {
                Arc::new(MemoryIndex::new(&config.store.index_name, dimension))
            }
        };

        let mut endpoint =
            EndpointConfig::new(&config.generation.endpoint, &config.generation.region);
        if let Some(api_key) = &config.generation.api_key {
            endpoint = endpoint.with_api_key(api_key);
        }
        let generator = EndpointClient::new(endpoint)?;

        Ok(Self::new(
            Arc::new(embedder),
            index,
            Arc::new(generator),
            QuerySettings::from(config),
        ))
    }

    /// Handle one event. Never fails: every error becomes an envelope.
    pub async fn handle(&self, event: &InboundEvent) -> Envelope {
        let method = event.http_method.as_deref().unwrap_or_default();
        let key = api_key(method, &event.resource);
        info!("--- RAG request handler: {key} ---");

        let route = Route::resolve(method, &event.resource);
        debug!("method=handle, api={key}, route={route}");

        let outcome = match route {
            Route::Unknown => {
                info!("error=api_not_found, api={key}");
                Err(OperationResult::failure(API_NOT_SUPPORTED))
            }
            Route::Ingest => settle(&key, self.ingest(event.body.as_deref()).await),
            Route::Delete => settle(&key, self.delete().await),
            Route::Query => settle(&key, self.query(event.query_param("query")).await),
        };

        response::format(outcome)
    }

    /// Embed `body.text` and add it to the index.
    pub async fn ingest(&self, body: Option<&str>) -> Result<OperationResult> {
        let body = body.ok_or(HandlerError::MissingField("text"))?;
        let payload: IngestBody = serde_json::from_str(body)?;
        let text = payload.text.ok_or(HandlerError::MissingField("text"))?;

        let embedding = self.embedder.encode(&text).await?;
        match self.index.insert(Document::new(text, embedding)).await {
            Ok(()) => Ok(OperationResult::success("Documents indexed successfully")),
            Err(VectorStoreError::Indexing(reason)) => {
                warn!("error indexing documents {reason}");
                Ok(OperationResult::failure(format!(
                    "error indexing documents {reason}"
                )))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Drop the whole index.
    pub async fn delete(&self) -> Result<OperationResult> {
        match self.index.delete_index().await {
            Ok(()) => Ok(OperationResult::success("Index deleted successfully")),
            Err(VectorStoreError::Deletion(reason)) => {
                warn!("error deleting index. {reason}");
                Ok(OperationResult::failure(format!(
                    "error deleting index. {reason}"
                )))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Answer `query` and present the outcome according to the policy.
    pub async fn query(&self, query: Option<&str>) -> Result<OperationResult> {
        let query = query.ok_or(HandlerError::MissingField("query"))?;
        let outcome = self.answer(query).await;

        match (outcome, self.settings.advisory_policy) {
            (Ok(QueryOutcome::Answer(answer)), _) => Ok(OperationResult::success(answer)),
            (Ok(outcome), AdvisoryPolicy::Mask) => {
                info!("query not answerable from index: {outcome:?}");
                Ok(OperationResult::success(INDEX_ADVISORY))
            }
            (Err(e), AdvisoryPolicy::Mask) => {
                warn!("query failed, returning advisory: {e}");
                Ok(OperationResult::success(INDEX_ADVISORY))
            }
            (Ok(_), AdvisoryPolicy::Surface) => Ok(OperationResult::failure(INDEX_ADVISORY)),
            (Err(e), AdvisoryPolicy::Surface) => Err(e),
        }
    }

    /// Run the query pipeline: embed, search, build the dialog, generate.
    pub async fn answer(&self, query: &str) -> Result<QueryOutcome> {
        let vector = self.embedder.encode(query).await?;

        let texts = match self.index.search(&vector, QUERY_TOP_K).await {
            Ok(texts) => texts,
            Err(VectorStoreError::IndexAbsent(name)) => {
                debug!("index {name} does not exist");
                return Ok(QueryOutcome::IndexAbsent);
            }
            Err(e) => return Err(e.into()),
        };
        if texts.is_empty() {
            return Ok(QueryOutcome::NoDocuments);
        }

        let context = texts.join(" ");
        debug!("content -> {context}");

        let request = GenerationRequest::new(
            build_dialog(&self.settings.system_prompt, &context, query),
            self.settings.parameters,
        );
        let generation = self.generator.generate(&request).await?;

        let mut answer = Map::new();
        answer.insert(
            generation.capitalized_role(),
            Value::String(generation.content),
        );
        info!("response from llm for {} context documents", texts.len());

        Ok(QueryOutcome::Answer(vec![Value::Object(answer)]))
    }
}

/// Turn an operation's result into the routing outcome handed to
/// [`response::format`]. Error detail is logged, never returned.
fn settle(
    key: &str,
    result: Result<OperationResult>,
) -> std::result::Result<OperationResult, OperationResult> {
    match result {
        Ok(result) => Ok(result),
        Err(HandlerError::MissingField(field)) => {
            info!("error=missing_field, api={key}, field={field}");
            Err(OperationResult::failure(format!("missing_{field}")))
        }
        Err(e) => {
            error!("error=error_processing_api, api={key}: {e:?}");
            Err(OperationResult::failure(SYSTEM_EXCEPTION))
        }
    }
}

/// System turn carries the retrieved context; user turn carries the query.
pub fn build_dialog(system_prompt: &str, context: &str, query: &str) -> Vec<Turn> {
    vec![
        Turn::system(format!("{system_prompt}\n{context}\n")),
        Turn::user(format!("{query} ? ")),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rag_generation::Role;

    #[test]
    fn test_settle_keeps_operation_result() {
        let failure = OperationResult::failure("error deleting index. gone");
        assert_eq!(settle("DELETE/rag/index-documents", Ok(failure.clone())), Ok(failure));
    }

    #[test]
    fn test_settle_missing_field() {
        let outcome = settle("GET/rag/query", Err(HandlerError::MissingField("query")));
        assert_eq!(outcome, Err(OperationResult::failure("missing_query")));
    }

    #[test]
    fn test_settle_hides_error_detail() {
        let e = rag_vector_store::VectorStoreError::Request {
            status: 500,
            reason: "cluster red".to_string(),
        };
        let outcome = settle("GET/rag/query", Err(e.into()));
        assert_eq!(outcome, Err(OperationResult::failure(SYSTEM_EXCEPTION)));
    }

    #[test]
    fn test_build_dialog() {
        let dialog = build_dialog("Be honest.", "cats are mammals", "are cats mammals");

        assert_eq!(dialog.len(), 2);
        assert_eq!(dialog[0].role, Role::System);
        assert_eq!(dialog[0].content, "Be honest.\ncats are mammals\n");
        assert_eq!(dialog[1].role, Role::User);
        assert_eq!(dialog[1].content, "are cats mammals ? ");
    }
}
