//! Documents, index schema and search request bodies.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use rag_embeddings::Embedding;

/// A text and its embedding, as stored in the index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Original text.
    pub text: String,

    /// Embedding of `text`.
    pub embedding: Embedding,
}

impl Document {
    /// Create a new document.
    pub fn new(text: impl Into<String>, embedding: Embedding) -> Self {
        Self {
            text: text.into(),
            embedding,
        }
    }
}

/// Settings and mappings used when the index is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexSchema {
    /// Dimension of the `embedding` field.
    pub dimension: usize,
}

impl IndexSchema {
    /// Create a schema for vectors of `dimension` floats.
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    /// Request body for index creation: knn enabled, fixed mappings.
    pub fn to_body(self) -> Value {
        json!({
            "settings": {
                "index": {
                    "knn": true,
                }
            },
            "mappings": {
                "properties": {
                    "id": {"type": "integer"},
                    "text": {"type": "text"},
                    "embedding": {
                        "type": "knn_vector",
                        "dimension": self.dimension,
                    },
                }
            },
        })
    }
}

/// A kNN query that only fetches the `text` field of each hit.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest<'a> {
    pub vector: &'a [f32],
    pub k: usize,
}

impl SearchRequest<'_> {
    pub fn to_body(&self) -> Value {
        json!({
            "size": self.k,
            "query": {
                "knn": {
                    "embedding": {
                        "vector": self.vector,
                        "k": self.k,
                    }
                }
            },
            "_source": false,
            "fields": ["text", "doc_type"],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_schema_body() {
        let body = IndexSchema::new(384).to_body();
        assert_eq!(body["settings"]["index"]["knn"], json!(true));
        assert_eq!(
            body["mappings"]["properties"]["embedding"],
            json!({"type": "knn_vector", "dimension": 384})
        );
        assert_eq!(body["mappings"]["properties"]["id"], json!({"type": "integer"}));
    }

    #[test]
    fn test_search_body_fetches_text_only() {
        let vector = [0.5, 0.25];
        let body = SearchRequest { vector: &vector, k: 2 }.to_body();

        assert_eq!(body["size"], json!(2));
        assert_eq!(body["_source"], json!(false));
        assert_eq!(body["query"]["knn"]["embedding"]["k"], json!(2));
        assert_eq!(body["query"]["knn"]["embedding"]["vector"], json!([0.5, 0.25]));
    }

    #[test]
    fn test_document_serializes_text_and_embedding() {
        let doc = Document::new("cats are mammals", vec![1.0, 0.0]);
        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(value, json!({"text": "cats are mammals", "embedding": [1.0, 0.0]}));
    }
}
