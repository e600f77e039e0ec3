use serde::{Deserialize, Serialize};

/// Spoken when the knowledge base returns a body without a `response` field.
pub const NO_ANSWER_FALLBACK: &str = "I couldn't find information about that.";

/// Request body for `POST /api/rag`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagRequest {
    pub query: String,
}

impl RagRequest {
    #[must_use]
    pub fn new(query: impl Into<String>) -> Self {
        Self { query: query.into() }
    }
}

/// Success body from `POST /api/rag`. Error bodies are opaque text and are
/// carried on the error instead.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RagResponse {
    pub response: Option<String>,
}

impl RagResponse {
    /// The answer text, or the fixed fallback when the field is absent.
    #[must_use]
    pub fn into_answer(self) -> String {
        self.response.unwrap_or_else(|| NO_ANSWER_FALLBACK.to_string())
    }
}
