//! Mistral chat-completion and embedding clients.
//!
//! Both clients speak the OpenAI-compatible JSON surface of the Mistral API
//! and share the crate-wide retry policy. The chat client serves all three
//! synthesis stages — the stages differ only in prompt content, never in
//! transport.

use crate::backend::{
    is_retryable_transport, retry_backoff, should_retry_status, ChatMessage, EmbeddingBackend,
    GenerativeBackend,
};
use crate::config::StudyGuideConfig;
use crate::error::StudyGenError;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

const MISTRAL_API_BASE: &str = "https://api.mistral.ai/v1";

/// Build a reqwest client with the bearer auth header preinstalled.
fn build_client(api_key: &str, timeout_secs: u64) -> Result<reqwest::Client, StudyGenError> {
    if api_key.trim().is_empty() {
        return Err(StudyGenError::ProviderNotConfigured {
            backend: "mistral".into(),
            hint: "The configured API key is empty.".into(),
        });
    }
    let mut headers = HeaderMap::new();
    let auth = format!("Bearer {}", api_key.trim());
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&auth)
            .map_err(|_| StudyGenError::InvalidConfig("API key contains invalid bytes".into()))?,
    );
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .default_headers(headers)
        .build()
        .map_err(|e| StudyGenError::Internal(format!("failed to build HTTP client: {e}")))
}

/// POST a JSON body with retry/backoff, returning the parsed response.
///
/// Shared by both clients; `backend` names the failing capability in errors
/// so a run that dies reports which stage killed it.
async fn post_with_retry<B: Serialize, R: for<'de> Deserialize<'de>>(
    client: &reqwest::Client,
    url: &str,
    body: &B,
    backend: &'static str,
    max_retries: u32,
    backoff_ms: u64,
) -> Result<R, StudyGenError> {
    let mut last_err = String::new();

    for attempt in 0..=max_retries {
        if attempt > 0 {
            let delay = retry_backoff(backoff_ms, attempt);
            warn!(
                "{} call: retry {}/{} after {}ms — {}",
                backend,
                attempt,
                max_retries,
                delay.as_millis(),
                last_err
            );
            tokio::time::sleep(delay).await;
        }

        match client.post(url).json(body).send().await {
            Ok(resp) => {
                let status = resp.status();
                if status.is_success() {
                    return resp
                        .json::<R>()
                        .await
                        .map_err(|e| StudyGenError::backend(backend, format!("bad response: {e}")));
                }
                let text = resp
                    .text()
                    .await
                    .unwrap_or_else(|_| "<body unavailable>".to_string());
                last_err = format!("HTTP {status}: {text}");
                if !should_retry_status(status) {
                    return Err(StudyGenError::backend(backend, last_err));
                }
            }
            Err(e) => {
                last_err = e.to_string();
                if !is_retryable_transport(&e) {
                    return Err(StudyGenError::backend(backend, last_err));
                }
            }
        }
    }

    Err(StudyGenError::backend(
        backend,
        format!("gave up after {max_retries} retries: {last_err}"),
    ))
}

// ── Chat ─────────────────────────────────────────────────────────────────

/// Chat-completion client for the generation stages.
#[derive(Clone, Debug)]
pub struct MistralChat {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    max_retries: u32,
    backoff_ms: u64,
}

impl MistralChat {
    pub fn new(api_key: &str, config: &StudyGuideConfig) -> Result<Self, StudyGenError> {
        Ok(Self {
            client: build_client(api_key, config.request_timeout_secs)?,
            endpoint: format!("{MISTRAL_API_BASE}/chat/completions"),
            model: config.gen_model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            max_retries: config.max_retries,
            backoff_ms: config.retry_backoff_ms,
        })
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: String,
}

#[async_trait]
impl GenerativeBackend for MistralChat {
    async fn generate(&self, messages: &[ChatMessage]) -> Result<String, StudyGenError> {
        let request = ChatRequest {
            model: &self.model,
            messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };
        let response: ChatResponse = post_with_retry(
            &self.client,
            &self.endpoint,
            &request,
            "generation",
            self.max_retries,
            self.backoff_ms,
        )
        .await?;

        let content = response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| StudyGenError::backend("generation", "response carried no choices"))?;
        debug!("generation call returned {} chars", content.len());
        Ok(content)
    }
}

// ── Embeddings ───────────────────────────────────────────────────────────

/// Embedding client; one passage per call by design.
#[derive(Clone)]
pub struct MistralEmbeddings {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    max_retries: u32,
    backoff_ms: u64,
}

impl MistralEmbeddings {
    pub fn new(api_key: &str, config: &StudyGuideConfig) -> Result<Self, StudyGenError> {
        Ok(Self {
            client: build_client(api_key, config.request_timeout_secs)?,
            endpoint: format!("{MISTRAL_API_BASE}/embeddings"),
            model: config.embedding_model.clone(),
            max_retries: config.max_retries,
            backoff_ms: config.retry_backoff_ms,
        })
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: [&'a str; 1],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[async_trait]
impl EmbeddingBackend for MistralEmbeddings {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, StudyGenError> {
        let request = EmbeddingRequest {
            model: &self.model,
            input: [text],
        };
        let response: EmbeddingResponse = post_with_retry(
            &self.client,
            &self.endpoint,
            &request,
            "embedding",
            self.max_retries,
            self.backoff_ms,
        )
        .await?;

        response
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| StudyGenError::backend("embedding", "response carried no vectors"))
    }
}
