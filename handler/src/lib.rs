//! # RAG Request Handler
//!
//! A stateless request router over three external services: a sentence
//! embedder, a kNN vector index and a hosted text-generation endpoint.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      RAG Request Handler                        │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  InboundEvent ──► Route ──► RequestRouter ──► format ──► Envelope│
//! │                                  │                              │
//! │              ┌───────────────────┼───────────────────┐          │
//! │              ▼                   ▼                   ▼          │
//! │          Embedder           VectorIndex      GenerationClient   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! | Method | Route | Operation |
//! |---|---|---|
//! | POST | /rag/index-documents | ingest `body.text` |
//! | DELETE | /rag/index-documents | delete the index |
//! | GET | /rag/query | answer the `query` parameter |

pub mod config;
pub mod error;
pub mod event;
pub mod response;
pub mod route;
pub mod router;
pub mod server;

pub use config::{AdvisoryPolicy, HandlerConfig};
pub use error::{ConfigError, HandlerError, Result};
pub use event::{Envelope, InboundEvent};
pub use response::{OperationResult, format, normalize_number};
pub use route::Route;
pub use router::{IndexBackend, QueryOutcome, QuerySettings, RequestRouter};
