//! Dialog turns, sampling parameters and the endpoint wire format.

use serde::{Deserialize, Serialize};

/// Speaker of a dialog turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One role-tagged turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    /// A system turn.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    /// A user turn.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Ordered sequence of turns given to the model.
pub type Dialog = Vec<Turn>;

/// Sampling parameters sent with every request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationParameters {
    /// Upper bound on generated tokens.
    pub max_tokens: u32,

    /// Nucleus sampling threshold.
    pub top_p: f32,

    /// Sampling temperature.
    pub temperature: f32,
}

impl Default for GenerationParameters {
    fn default() -> Self {
        Self {
            max_tokens: 1000,
            top_p: 0.6,
            temperature: 0.9,
        }
    }
}

/// A dialog plus sampling parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub dialog: Dialog,
    pub max_tokens: u32,
    pub top_p: f32,
    pub temperature: f32,
    pub return_full_text: bool,
}

impl GenerationRequest {
    /// Create a request that only returns newly generated text.
    pub fn new(dialog: Dialog, parameters: GenerationParameters) -> Self {
        Self {
            dialog,
            max_tokens: parameters.max_tokens,
            top_p: parameters.top_p,
            temperature: parameters.temperature,
            return_full_text: false,
        }
    }

    /// Wire payload: the dialog wrapped in a single-element batch.
    pub fn to_payload(&self) -> Payload<'_> {
        Payload {
            inputs: [&self.dialog],
            parameters: PayloadParameters {
                max_new_tokens: self.max_tokens,
                top_p: self.top_p,
                temperature: self.temperature,
                return_full_text: self.return_full_text,
            },
        }
    }
}

/// Request body understood by the endpoint.
#[derive(Debug, Serialize)]
pub struct Payload<'a> {
    inputs: [&'a Dialog; 1],
    parameters: PayloadParameters,
}

#[derive(Debug, Serialize)]
struct PayloadParameters {
    max_new_tokens: u32,
    top_p: f32,
    temperature: f32,
    return_full_text: bool,
}

/// A generated reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Generation {
    /// Role reported by the model, as sent (usually `assistant`).
    pub role: String,

    /// Generated text.
    pub content: String,
}

impl Generation {
    /// Role with the first letter upper-cased and the rest lower-cased.
    pub fn capitalized_role(&self) -> String {
        capitalize(&self.role)
    }
}

/// Upper-case the first character and lower-case the rest.
pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

/// One element of the endpoint's batch response.
#[derive(Debug, Deserialize)]
pub(crate) struct BatchItem {
    pub(crate) generation: Generation,
}
