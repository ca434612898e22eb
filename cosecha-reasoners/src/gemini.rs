//! Gemini reasoner implementation.
//!
//! This module provides a client for Google's Gemini API. Requests are sent
//! as multi-part content (text and inline media), with JSON response mode
//! enabled so candidates come back as bare JSON.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::{Deserialize, Serialize};

use cosecha_core::composer::PromptPart;
use cosecha_core::reasoner::{GenerateRequest, Reasoner, ReasonerError, ReasoningCandidate};

/// Gemini client configuration.
#[derive(Debug, Clone)]
pub struct GeminiReasonerConfig {
    /// API key for authentication.
    pub api_key: String,
    /// Base endpoint URL.
    pub endpoint: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for GeminiReasonerConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            endpoint: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Gemini reasoner client.
pub struct GeminiReasoner {
    client: reqwest::Client,
    config: GeminiReasonerConfig,
}

impl GeminiReasoner {
    /// Create a new Gemini client.
    pub fn new(config: GeminiReasonerConfig) -> Result<Self, ReasonerError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ReasonerError::Http(e.to_string()))?;
        Ok(Self { client, config })
    }

    fn build_url(&self, model: &str) -> String {
        format!(
            "{}/models/{}:generateContent?key={}",
            self.config.endpoint, model, self.config.api_key
        )
    }
}

// Gemini API request/response structures

#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(rename = "generationConfig")]
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    role: String,
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize)]
struct GeminiPart {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(rename = "inlineData", skip_serializing_if = "Option::is_none")]
    inline_data: Option<GeminiInlineData>,
}

#[derive(Debug, Serialize)]
struct GeminiInlineData {
    #[serde(rename = "mimeType")]
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
struct GeminiGenerationConfig {
    temperature: f32,
    #[serde(rename = "responseMimeType")]
    response_mime_type: String,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    candidates: Option<Vec<GeminiCandidate>>,
    error: Option<GeminiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContentResponse>,
}

#[derive(Debug, Deserialize)]
struct GeminiContentResponse {
    parts: Option<Vec<GeminiPartResponse>>,
}

#[derive(Debug, Deserialize)]
struct GeminiPartResponse {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorDetail {
    message: String,
    #[allow(dead_code)]
    code: Option<i32>,
}

fn to_gemini_part(part: PromptPart) -> GeminiPart {
    match part {
        PromptPart::Text(text) => GeminiPart {
            text: Some(text),
            inline_data: None,
        },
        PromptPart::InlineMedia { mime_type, data } => GeminiPart {
            text: None,
            inline_data: Some(GeminiInlineData { mime_type, data }),
        },
    }
}

#[async_trait]
impl Reasoner for GeminiReasoner {
    async fn generate(
        &self,
        request: GenerateRequest,
    ) -> Result<ReasoningCandidate, ReasonerError> {
        let url = self.build_url(&request.model);

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let body = GeminiRequest {
            contents: vec![GeminiContent {
                role: "user".to_string(),
                parts: request.parts.into_iter().map(to_gemini_part).collect(),
            }],
            generation_config: GeminiGenerationConfig {
                temperature: request.temperature,
                response_mime_type: "application/json".to_string(),
            },
        };

        let response = self
            .client
            .post(&url)
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

        let parsed: GeminiResponse =
            serde_json::from_str(&text).map_err(|e| ReasonerError::Serialization(e.to_string()))?;

        if let Some(error) = parsed.error {
            return Err(ReasonerError::Response(format!(
                "Gemini API error: {}",
                error.message
            )));
        }

        // A successful call with no candidate text is an absent result, not
        // an error; the flow's fallback policy decides what happens next.
        let content = parsed
            .candidates
            .and_then(|c| c.into_iter().next())
            .and_then(|c| c.content)
            .and_then(|c| c.parts)
            .map(|parts| {
                parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .filter(|text| !text.is_empty());

        Ok(match content {
            Some(text) => ReasoningCandidate::from_text(text),
            None => ReasoningCandidate::none(),
        })
    }
}
