//! Configuration for the request handler.
//!
//! Everything comes from the process environment (a `.env` file is loaded
//! first if present). Only `MODEL_PATH` is required.

use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use rag_generation::GenerationParameters;
use rag_vector_store::DEFAULT_INDEX_NAME;

use crate::error::ConfigError;

/// Preamble prepended to every retrieved context.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful, respectful and honest assistant. \
Always answer as helpfully as possible, while being safe. \
Please ensure that your responses are socially unbiased and positive in nature. \
If a question does not make any sense, or is not factually coherent, \
explain why instead of answering something not correct. \
If you don't know the answer to a question, please don't share false information.";

/// Configuration for the request handler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandlerConfig {
    /// Vector store connection.
    pub store: StoreConfig,

    /// Generation endpoint connection and sampling.
    pub generation: GenerationConfig,

    /// Directory of the sentence-transformer model.
    pub model_path: PathBuf,

    /// Preamble for the system turn.
    pub system_prompt: String,

    /// How query failures are presented to callers.
    pub advisory_policy: AdvisoryPolicy,
}

/// Vector store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Cluster endpoint URL.
    pub endpoint: String,

    /// Index holding the documents.
    pub index_name: String,

    /// Basic auth username.
    pub username: Option<String>,

    /// Basic auth password.
    #[serde(skip_serializing, default)]
    pub password: Option<String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://localhost:9200".to_string(),
            index_name: DEFAULT_INDEX_NAME.to_string(),
            username: None,
            password: None,
        }
    }
}

/// Generation endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Hosted endpoint name or full invocation URL.
    pub endpoint: String,

    /// Cloud region of the hosted endpoint.
    pub region: String,

    /// Bearer token for the endpoint.
    #[serde(skip_serializing, default)]
    pub api_key: Option<String>,

    /// Sampling parameters.
    pub parameters: GenerationParameters,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            endpoint: "llama2-7b-endpoint".to_string(),
            region: "us-east-1".to_string(),
            api_key: None,
            parameters: GenerationParameters::default(),
        }
    }
}

/// What a caller sees when the query pipeline fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdvisoryPolicy {
    /// Success-shaped envelope carrying an advisory message.
    #[default]
    Mask,
    /// Failure envelope; unexpected errors become `system_exception`.
    Surface,
}

impl FromStr for AdvisoryPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mask" => Ok(Self::Mask),
            "surface" => Ok(Self::Surface),
            other => Err(format!("expected mask or surface, got {other}")),
        }
    }
}

impl HandlerConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through `lookup`, which maps a variable name to
    /// its value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let model_path = lookup("MODEL_PATH")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .ok_or(ConfigError::Missing("MODEL_PATH"))?;

        let mut store = StoreConfig::default();
        if let Some(endpoint) = lookup("OPENSEARCH_ENDPOINT") {
            store.endpoint = endpoint;
        }
        if let Some(index_name) = lookup("INDEX_NAME") {
            store.index_name = index_name;
        }
        store.username = lookup("OPENSEARCH_USERNAME");
        store.password = lookup("OPENSEARCH_PASSWORD");

        let mut generation = GenerationConfig::default();
        if let Some(endpoint) = lookup("SAGEMAKER_ENDPOINT") {
            generation.endpoint = endpoint;
        }
        if let Some(region) = lookup("REGION") {
            generation.region = region;
        }
        generation.api_key = lookup("GENERATION_API_KEY");
        if let Some(max_tokens) = parse_var(&lookup, "MAX_TOKENS")? {
            generation.parameters.max_tokens = max_tokens;
        }
        if let Some(temperature) = parse_var(&lookup, "TEMPERATURE")? {
            generation.parameters.temperature = temperature;
        }
        if let Some(top_p) = parse_var(&lookup, "TOP_P")? {
            generation.parameters.top_p = top_p;
        }

        let system_prompt =
            lookup("DEFAULT_SYSTEM_PROMPT").unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string());
        let advisory_policy = parse_var(&lookup, "RAG_ADVISORY_POLICY")?.unwrap_or_default();

        Ok(Self {
            store,
            generation,
            model_path,
            system_prompt,
            advisory_policy,
        })
    }
}

fn parse_var<F, T>(lookup: &F, var: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(var) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|e: T::Err| ConfigError::Invalid {
                var,
                value,
                reason: e.to_string(),
            }),
    }
}
