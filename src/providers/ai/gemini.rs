//! Gemini provider implementation.
//!
//! Speaks the Generative Language REST API for both chat completion
//! and text embedding. The embedding endpoints return two different
//! response shapes (a lone `embedding` object from `:embedContent`,
//! an `embeddings` array from `:batchEmbedContents`); both are
//! normalized here so callers never see the difference.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use serde::{Deserialize, Serialize};

use super::traits::{
    ChatMessage, ChatProvider, ChatRole, EmbeddingProvider, ProviderError, ProviderResult,
};
use crate::domain::EMBEDDING_DIM;

/// Default base URL for the Generative Language API.
const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Gemini chat request format.
#[derive(Debug, Serialize)]
struct GeminiGenerateRequest {
    #[serde(rename = "systemInstruction", skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    contents: Vec<GeminiContent>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    text: String,
}

/// Gemini chat response format.
#[derive(Debug, Deserialize)]
struct GeminiGenerateResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: GeminiContent,
}

/// Gemini batch embedding request format.
#[derive(Debug, Serialize)]
struct GeminiBatchEmbedRequest {
    requests: Vec<GeminiEmbedRequest>,
}

#[derive(Debug, Serialize)]
struct GeminiEmbedRequest {
    model: String,
    content: GeminiContent,
}

/// Gemini embedding response format.
///
/// Accepts both the batch shape (`embeddings` array) and the single
/// shape (`embedding` object).
#[derive(Debug, Deserialize)]
struct GeminiEmbedResponse {
    embeddings: Option<Vec<GeminiEmbeddingValues>>,
    embedding: Option<GeminiEmbeddingValues>,
}

#[derive(Debug, Deserialize)]
struct GeminiEmbeddingValues {
    values: Vec<f32>,
}

impl GeminiEmbedResponse {
    /// Flattens either response shape into an ordered vector list.
    fn into_vectors(self) -> Vec<Vec<f32>> {
        if let Some(embeddings) = self.embeddings {
            return embeddings.into_iter().map(|e| e.values).collect();
        }
        self.embedding
            .map(|e| vec![e.values])
            .unwrap_or_default()
    }
}

/// Gemini API error response.
#[derive(Debug, Deserialize)]
struct GeminiError {
    error: GeminiErrorDetail,
}

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct GeminiErrorDetail {
    code: Option<u16>,
    message: String,
    status: Option<String>,
}

/// Provider for the Gemini API, covering chat and embeddings.
pub struct GeminiProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    chat_model: String,
    embed_model: String,
    dimension: usize,
}

impl GeminiProvider {
    /// Creates a new provider against the public Gemini endpoint.
    pub fn new(
        api_key: impl Into<String>,
        chat_model: impl Into<String>,
        embed_model: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: GEMINI_BASE_URL.to_string(),
            api_key: api_key.into(),
            chat_model: chat_model.into(),
            embed_model: embed_model.into(),
            dimension: EMBEDDING_DIM,
        }
    }

    /// Overrides the base URL (useful for proxies or test servers).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Overrides the expected embedding width.
    pub fn with_dimension(mut self, dimension: usize) -> Self {
        self.dimension = dimension;
        self
    }

    /// Overrides the HTTP client (useful for custom timeouts or proxies).
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    fn build_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Ok(value) = HeaderValue::from_str(&self.api_key) {
            headers.insert(HeaderName::from_static("x-goog-api-key"), value);
        }

        headers
    }

    fn require_api_key(&self) -> ProviderResult<()> {
        if self.api_key.trim().is_empty() {
            return Err(ProviderError::MissingApiKey("gemini".to_string()));
        }
        Ok(())
    }

    fn build_chat_request(&self, messages: &[ChatMessage]) -> GeminiGenerateRequest {
        // Gemini takes the system prompt as a separate field and names
        // the assistant role "model".
        let mut system_parts: Vec<GeminiPart> = Vec::new();
        let mut contents: Vec<GeminiContent> = Vec::new();

        for message in messages {
            match message.role {
                ChatRole::System => system_parts.push(GeminiPart {
                    text: message.content.clone(),
                }),
                ChatRole::User => contents.push(GeminiContent {
                    role: Some("user".to_string()),
                    parts: vec![GeminiPart {
                        text: message.content.clone(),
                    }],
                }),
                ChatRole::Assistant => contents.push(GeminiContent {
                    role: Some("model".to_string()),
                    parts: vec![GeminiPart {
                        text: message.content.clone(),
                    }],
                }),
            }
        }

        let system_instruction = if system_parts.is_empty() {
            None
        } else {
            Some(GeminiContent {
                role: None,
                parts: system_parts,
            })
        };

        GeminiGenerateRequest {
            system_instruction,
            contents,
        }
    }

    async fn handle_error_response(&self, response: reqwest::Response) -> ProviderError {
        let status = response.status().as_u16();

        if let Ok(error) = response.json::<GeminiError>().await {
            return ProviderError::ApiError {
                status,
                message: error.error.message,
            };
        }

        ProviderError::ApiError {
            status,
            message: format!("HTTP {}", status),
        }
    }
}

#[async_trait]
impl EmbeddingProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed_batch(&self, texts: &[String]) -> ProviderResult<Vec<Vec<f32>>> {
        self.require_api_key()?;

        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!(
            "{}/models/{}:batchEmbedContents",
            self.base_url, self.embed_model
        );
        let body = GeminiBatchEmbedRequest {
            requests: texts
                .iter()
                .map(|text| GeminiEmbedRequest {
                    model: format!("models/{}", self.embed_model),
                    content: GeminiContent {
                        role: None,
                        parts: vec![GeminiPart { text: text.clone() }],
                    },
                })
                .collect(),
        };

        let response = self
            .client
            .post(&url)
            .headers(self.build_headers())
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(self.handle_error_response(response).await);
        }

        let api_response: GeminiEmbedResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(format!("Failed to parse response: {}", e)))?;

        let vectors = api_response.into_vectors();
        if vectors.len() != texts.len() {
            return Err(ProviderError::InvalidResponse(format!(
                "Expected {} embeddings, got {}",
                texts.len(),
                vectors.len()
            )));
        }

        Ok(vectors)
    }
}

#[async_trait]
impl ChatProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    fn model(&self) -> &str {
        &self.chat_model
    }

    async fn complete(&self, messages: &[ChatMessage]) -> ProviderResult<String> {
        self.require_api_key()?;

        let url = format!(
            "{}/models/{}:generateContent",
            self.base_url, self.chat_model
        );
        let body = self.build_chat_request(messages);

        let response = self
            .client
            .post(&url)
            .headers(self.build_headers())
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(self.handle_error_response(response).await);
        }

        let api_response: GeminiGenerateResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(format!("Failed to parse response: {}", e)))?;

        let candidate = api_response
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::InvalidResponse("No candidates in response".to_string()))?;

        if candidate.content.parts.is_empty() {
            return Err(ProviderError::InvalidResponse(
                "No text parts in candidate".to_string(),
            ));
        }

        let text = candidate
            .content
            .parts
            .into_iter()
            .map(|part| part.text)
            .collect::<Vec<_>>()
            .join("");

        Ok(text.trim().to_string())
    }
}
