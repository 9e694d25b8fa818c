//! # Generation
//!
//! Client for a hosted chat-style text-generation endpoint.
//!
//! A [`Dialog`] of role-tagged turns plus sampling parameters is sent as a
//! single-element batch; the first generation in the reply is returned.
//!
//! ```text
//! GenerationRequest ──► {"inputs": [dialog], "parameters": {..}}
//!                                   │
//!                                   ▼
//!                          hosted model endpoint
//!                                   │
//!                                   ▼
//! Generation ◄── [{"generation": {"role", "content"}}]
//! ```

pub mod client;
pub mod dialog;
pub mod error;

pub use client::{EndpointClient, EndpointConfig, GenerationClient};
pub use dialog::{
    Dialog, Generation, GenerationParameters, GenerationRequest, Role, Turn, capitalize,
};
pub use error::{GenerationError, Result};
