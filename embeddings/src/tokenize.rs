//! Tokenization for BERT-style sentence encoders.

use std::path::Path;

use tokenizers::{Tokenizer, TruncationParams};

use crate::error::{EmbeddingError, Result};

/// Tokenizer wrapper that truncates to the model's sequence limit.
///
/// Truncation runs inside the tokenizer, so the special tokens added by the
/// post-processor (`[CLS]` ... `[SEP]`) always survive within the limit.
pub struct EmbedTokenizer {
    tokenizer: Tokenizer,
}

/// Tokenized input ready for model inference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenizedInput {
    pub input_ids: Vec<i64>,
    pub attention_mask: Vec<i64>,
    pub token_type_ids: Vec<i64>,
}

impl TokenizedInput {
    /// Number of tokens, special tokens included.
    pub fn len(&self) -> usize {
        self.input_ids.len()
    }

    /// Whether the input holds no tokens at all.
    pub fn is_empty(&self) -> bool {
        self.input_ids.is_empty()
    }
}

impl EmbedTokenizer {
    /// Load a `tokenizer.json` file and cap encodings at `max_length` tokens.
    pub fn from_file(path: &Path, max_length: usize) -> Result<Self> {
        let mut tokenizer = Tokenizer::from_file(path)
            .map_err(|e| EmbeddingError::TokenizerLoad(format!("{}: {e}", path.display())))?;

        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length,
                ..Default::default()
            }))
            .map_err(|e| EmbeddingError::TokenizerLoad(e.to_string()))?;

        Ok(Self { tokenizer })
    }

    /// Tokenize a single text, adding the model's special tokens.
    pub fn encode(&self, text: &str) -> Result<TokenizedInput> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| EmbeddingError::Tokenize(e.to_string()))?;

        let input = TokenizedInput {
            input_ids: encoding.get_ids().iter().map(|&id| i64::from(id)).collect(),
            attention_mask: encoding
                .get_attention_mask()
                .iter()
                .map(|&m| i64::from(m))
                .collect(),
            token_type_ids: encoding
                .get_type_ids()
                .iter()
                .map(|&id| i64::from(id))
                .collect(),
        };

        if input.is_empty() {
            return Err(EmbeddingError::Tokenize(
                "tokenizer produced no tokens".to_string(),
            ));
        }

        Ok(input)
    }
}
