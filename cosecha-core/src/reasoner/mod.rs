//! The reasoning-service boundary.
//!
//! [`Reasoner`] is the pipeline's only network-bound, potentially slow,
//! potentially non-deterministic seam. Implementations carry no retry loop
//! and no fallback policy: a transport or service failure is a
//! [`ReasonerError`], an empty-but-successful response is an absent
//! [`ReasoningCandidate`]. What to do about either is decided per flow, one
//! layer up.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::composer::PromptPart;

/// One reasoning call, bound to a flow and a model.
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    /// Flow name, for logging and capture.
    pub flow: String,
    /// Model identifier understood by the backend.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Composed request body.
    pub parts: Vec<PromptPart>,
}

impl GenerateRequest {
    /// Concatenated text parts, for backends without media support.
    pub fn joined_text(&self) -> String {
        let mut out = String::new();
        for part in &self.parts {
            if let PromptPart::Text(text) = part {
                if !out.is_empty() {
                    out.push('\n');
                }
                out.push_str(text);
            }
        }
        out
    }

    /// Whether any part carries binary media.
    pub fn has_media(&self) -> bool {
        self.parts
            .iter()
            .any(|part| matches!(part, PromptPart::InlineMedia { .. }))
    }
}

/// Raw candidate output from the external reasoner.
///
/// Absence is a valid, expected outcome of a successful call, not an error.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReasoningCandidate {
    text: Option<String>,
}

impl ReasoningCandidate {
    /// A candidate carrying raw reasoner text.
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
        }
    }

    /// No candidate was produced.
    pub fn none() -> Self {
        Self { text: None }
    }

    /// Raw text, if any.
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// Whether a candidate is present.
    pub fn is_some(&self) -> bool {
        self.text.is_some()
    }
}

/// Reasoner errors
#[derive(Debug, Clone, Error)]
pub enum ReasonerError {
    #[error("http error: {0}")]
    Http(String),
    #[error("response error: {0}")]
    Response(String),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("backend does not support inline media")]
    UnsupportedMedia,
}

/// External reasoning service client.
#[async_trait]
pub trait Reasoner: Send + Sync {
    /// Send one composed request and return the raw candidate.
    async fn generate(&self, request: GenerateRequest)
        -> Result<ReasoningCandidate, ReasonerError>;
}

#[async_trait]
impl<R: Reasoner + ?Sized> Reasoner for Arc<R> {
    async fn generate(
        &self,
        request: GenerateRequest,
    ) -> Result<ReasoningCandidate, ReasonerError> {
        (**self).generate(request).await
    }
}
