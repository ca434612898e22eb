//! OpenAI-compatible HTTP reasoner.
//!
//! Text-only: flows that embed media must use a backend with native media
//! support. Useful for self-hosted or proxied chat-completions endpoints.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};

use cosecha_core::reasoner::{GenerateRequest, Reasoner, ReasonerError, ReasoningCandidate};

/// HTTP client config (OpenAI-compatible).
#[derive(Debug, Clone)]
pub struct HttpReasonerConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for HttpReasonerConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1/chat/completions".to_string(),
            api_key: None,
            timeout_secs: 30,
        }
    }
}

/// Reasoner client using an OpenAI-compatible chat API.
pub struct HttpReasoner {
    client: reqwest::Client,
    config: HttpReasonerConfig,
}

impl HttpReasoner {
    /// Create a new client.
    pub fn new(config: HttpReasonerConfig) -> Result<Self, ReasonerError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ReasonerError::Http(e.to_string()))?;
        Ok(Self { client, config })
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Debug, Deserialize)]
struct ChatMessageResponse {
    content: Option<String>,
}

#[async_trait]
impl Reasoner for HttpReasoner {
    async fn generate(
        &self,
        request: GenerateRequest,
    ) -> Result<ReasoningCandidate, ReasonerError> {
        if request.has_media() {
            return Err(ReasonerError::UnsupportedMedia);
        }

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(key) = &self.config.api_key {
            let value = format!("Bearer {}", key);
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&value).map_err(|e| ReasonerError::Http(e.to_string()))?,
            );
        }

        let body = ChatRequest {
            model: request.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: request.joined_text(),
            }],
            temperature: request.temperature,
        };

        let response = self
            .client
            .post(&self.config.endpoint)
            .headers(headers)
            .json(&body)
            .send()
            .await
            .map_err(|e| ReasonerError::Http(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(ReasonerError::Response(format!("HTTP {}: {}", status, text)));
        }

        let text = response
            .text()
            .await
            .map_err(|e| ReasonerError::Http(e.to_string()))?;
        let parsed: ChatResponse =
            serde_json::from_str(&text).map_err(|e| ReasonerError::Serialization(e.to_string()))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|text| !text.is_empty());

        Ok(match content {
            Some(text) => ReasoningCandidate::from_text(text),
            None => ReasoningCandidate::none(),
        })
    }
}
