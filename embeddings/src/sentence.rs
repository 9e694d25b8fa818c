//! Local sentence-transformer embedder.
//!
//! Loads an ONNX export of a BERT-style sentence encoder (all-MiniLM-L6-v2
//! and friends) together with its `tokenizer.json`, and reproduces the
//! sentence-transformers pipeline: token embeddings, attention-masked mean
//! pooling, then L2 normalisation.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, info};
use tract_onnx::prelude::*;

use crate::error::{EmbeddingError, Result};
use crate::provider::Embedder;
use crate::similarity::normalize;
use crate::tokenize::{EmbedTokenizer, TokenizedInput};
use crate::{EMBEDDING_DIMENSION, Embedding};

/// Configuration for [`SentenceEmbedder`].
#[derive(Debug, Clone)]
pub struct SentenceEmbedderConfig {
    /// Directory holding `model.onnx` (or `onnx/model.onnx`) and `tokenizer.json`.
    pub model_path: PathBuf,

    /// Maximum number of tokens fed to the model.
    pub max_sequence_length: usize,

    /// Whether to L2-normalise the pooled vector.
    pub normalize: bool,

    /// Expected output dimension.
    pub dimension: usize,
}

impl SentenceEmbedderConfig {
    /// Create a configuration for the model directory at `model_path`.
    pub fn new(model_path: impl Into<PathBuf>) -> Self {
        Self {
            model_path: model_path.into(),
            max_sequence_length: 256,
            normalize: true,
            dimension: EMBEDDING_DIMENSION,
        }
    }

    /// Normalise a pooled vector if configured, then check its length.
    pub fn finish(&self, mut embedding: Embedding) -> Result<Embedding> {
        if self.normalize {
            normalize(&mut embedding);
        }

        if embedding.len() != self.dimension {
            return Err(EmbeddingError::DimensionMismatch {
                expected: self.dimension,
                actual: embedding.len(),
            });
        }

        Ok(embedding)
    }

    fn onnx_path(&self) -> Result<PathBuf> {
        let candidates = [
            self.model_path.join("model.onnx"),
            self.model_path.join("onnx").join("model.onnx"),
        ];

        candidates
            .into_iter()
            .find(|p| p.is_file())
            .ok_or_else(|| {
                EmbeddingError::ModelLoad(format!(
                    "no model.onnx found under {}",
                    self.model_path.display()
                ))
            })
    }
}

/// Sentence embedder backed by a tract ONNX plan.
///
/// The plan and tokenizer are loaded once and are read-only afterwards, so a
/// single instance can be shared across requests.
pub struct SentenceEmbedder {
    name: String,
    model: TypedRunnableModel<TypedModel>,
    tokenizer: EmbedTokenizer,
    config: SentenceEmbedderConfig,
}

impl SentenceEmbedder {
    /// Load the model and tokenizer described by `config`.
    pub fn load(config: SentenceEmbedderConfig) -> Result<Self> {
        let onnx_path = config.onnx_path()?;
        info!("Loading sentence embedder from {}", onnx_path.display());

        let model = tract_onnx::onnx()
            .model_for_path(&onnx_path)
            .map_err(|e| EmbeddingError::ModelLoad(e.to_string()))?
            .into_optimized()
            .map_err(|e| EmbeddingError::ModelLoad(e.to_string()))?
            .into_runnable()
            .map_err(|e| EmbeddingError::ModelLoad(e.to_string()))?;

        let tokenizer = EmbedTokenizer::from_file(
            &config.model_path.join("tokenizer.json"),
            config.max_sequence_length,
        )?;

        let name = model_name(&config.model_path);
        info!("Sentence embedder {name} ready");

        Ok(Self {
            name,
            model,
            tokenizer,
            config,
        })
    }

    fn run(&self, input: &TokenizedInput) -> Result<Embedding> {
        let seq_len = input.len();
        let input_count = self.model.model().inputs.len();

        let mut tensors: TVec<TValue> = tvec![
            to_tensor(&input.input_ids, seq_len)?.into(),
            to_tensor(&input.attention_mask, seq_len)?.into(),
        ];
        // Some exports drop token_type_ids.
        if input_count > 2 {
            tensors.push(to_tensor(&input.token_type_ids, seq_len)?.into());
        }

        let outputs = self
            .model
            .run(tensors)
            .map_err(|e| EmbeddingError::Inference(e.to_string()))?;

        let output = outputs
            .first()
            .ok_or_else(|| EmbeddingError::Inference("model produced no outputs".to_string()))?;
        let view = output
            .to_array_view::<f32>()
            .map_err(|e| EmbeddingError::Shape(e.to_string()))?;

        let values: Vec<f32> = view.iter().copied().collect();
        pool_output(view.shape(), values, &input.attention_mask)
    }
}

#[async_trait]
impl Embedder for SentenceEmbedder {
    fn name(&self) -> &str {
        &self.name
    }

    fn dimension(&self) -> usize {
        self.config.dimension
    }

    async fn encode(&self, text: &str) -> Result<Embedding> {
        if text.trim().is_empty() {
            return Err(EmbeddingError::EmptyInput);
        }

        let input = self.tokenizer.encode(text)?;
        debug!("Encoding {} tokens with {}", input.len(), self.name);

        self.config.finish(self.run(&input)?)
    }
}

fn to_tensor(values: &[i64], seq_len: usize) -> Result<Tensor> {
    Tensor::from_shape(&[1, seq_len], values).map_err(|e| EmbeddingError::Shape(e.to_string()))
}

fn model_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Reduce the first model output to one sentence vector.
///
/// A `(1, seq_len, hidden)` output holds token embeddings and is mean-pooled
/// over `attention_mask`; a `(1, hidden)` output is already pooled.
pub fn pool_output(
    shape: &[usize],
    values: Vec<f32>,
    attention_mask: &[i64],
) -> Result<Embedding> {
    match shape {
        [1, tokens, hidden] if *tokens == attention_mask.len() => {
            Ok(mean_pool(&values, *hidden, attention_mask))
        }
        [1, _hidden] => Ok(values),
        other => Err(EmbeddingError::Shape(format!("{other:?}"))),
    }
}

/// Mean of the token rows whose attention mask is set.
///
/// `token_embeddings` is a row-major `seq_len x hidden` matrix.
pub fn mean_pool(token_embeddings: &[f32], hidden: usize, attention_mask: &[i64]) -> Embedding {
    let mut sum = vec![0.0f32; hidden];
    let mut count = 0.0f32;

    for (row, &mask) in token_embeddings.chunks(hidden).zip(attention_mask) {
        if mask > 0 {
            for (acc, val) in sum.iter_mut().zip(row) {
                *acc += val;
            }
            count += 1.0;
        }
    }

    if count > 0.0 {
        sum.iter_mut().for_each(|v| *v /= count);
    }

    sum
}
