//! Vision captioning client for embedded PDF diagrams.
//!
//! Talks to a local Ollama host's `/api/chat` endpoint with the image as a
//! base64 attachment. Captioning is the only backend with no API key — it
//! just needs the host to be up, which is why [`crate::backend::Backends`]
//! always constructs it and failures surface per page as the degraded
//! [`crate::error::CaptionOutcome::Skipped`] path rather than killing a run.

use crate::backend::{is_retryable_transport, retry_backoff, should_retry_status, CaptionBackend};
use crate::config::StudyGuideConfig;
use crate::error::StudyGenError;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// Captioning client for an Ollama-served vision model.
#[derive(Clone)]
pub struct OllamaCaptioner {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    max_retries: u32,
    backoff_ms: u64,
}

#[derive(Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: Vec<OllamaMessage<'a>>,
    stream: bool,
}

#[derive(Serialize)]
struct OllamaMessage<'a> {
    role: &'a str,
    content: &'a str,
    images: Vec<String>,
}

#[derive(Deserialize)]
struct OllamaChatResponse {
    message: OllamaResponseMessage,
}

#[derive(Deserialize)]
struct OllamaResponseMessage {
    content: String,
}

impl OllamaCaptioner {
    pub fn new(config: &StudyGuideConfig) -> Result<Self, StudyGenError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| StudyGenError::Internal(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            endpoint: format!("{}/api/chat", config.ollama_host.trim_end_matches('/')),
            model: config.caption_model.clone(),
            max_retries: config.max_retries,
            backoff_ms: config.retry_backoff_ms,
        })
    }
}

#[async_trait]
impl CaptionBackend for OllamaCaptioner {
    async fn caption(&self, image_png: &[u8], prompt: &str) -> Result<String, StudyGenError> {
        let b64 = STANDARD.encode(image_png);
        debug!("captioning image ({} bytes base64)", b64.len());

        let request = OllamaChatRequest {
            model: &self.model,
            messages: vec![OllamaMessage {
                role: "user",
                content: prompt,
                images: vec![b64],
            }],
            stream: false,
        };

        let mut last_err = String::new();
        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = retry_backoff(self.backoff_ms, attempt);
                warn!(
                    "caption: retry {}/{} after {}ms — {}",
                    attempt,
                    self.max_retries,
                    delay.as_millis(),
                    last_err
                );
                tokio::time::sleep(delay).await;
            }

            match self.client.post(&self.endpoint).json(&request).send().await {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        let parsed: OllamaChatResponse = resp.json().await.map_err(|e| {
                            StudyGenError::backend("caption", format!("bad response: {e}"))
                        })?;
                        return Ok(parsed.message.content);
                    }
                    let text = resp
                        .text()
                        .await
                        .unwrap_or_else(|_| "<body unavailable>".to_string());
                    last_err = format!("HTTP {status}: {text}");
                    if !should_retry_status(status) {
                        return Err(StudyGenError::backend("caption", last_err));
                    }
                }
                Err(e) => {
                    last_err = e.to_string();
                    if !is_retryable_transport(&e) {
                        return Err(StudyGenError::backend("caption", last_err));
                    }
                }
            }
        }

        Err(StudyGenError::backend(
            "caption",
            format!("gave up after {} retries: {last_err}", self.max_retries),
        ))
    }
}
