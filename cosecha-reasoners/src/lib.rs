//! # Cosecha Reasoners
//!
//! [`Reasoner`](cosecha_core::reasoner::Reasoner) implementations:
//! - [`GeminiReasoner`]: Google Gemini API, text + inline media
//! - [`HttpReasoner`]: OpenAI-compatible chat API, text only
//! - [`MockReasoner`]: scriptable client for tests and demos
//!
//! Clients carry no retry loop and no fallback policy; both live with the
//! flow definitions, one layer up.

mod factory;
mod gemini;
mod http;
mod mock;

pub use factory::{build_reasoner, ReasonerBuildError};
pub use gemini::{GeminiReasoner, GeminiReasonerConfig};
pub use http::{HttpReasoner, HttpReasonerConfig};
pub use mock::MockReasoner;
