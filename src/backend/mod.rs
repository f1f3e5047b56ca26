//! Backend capability traits and production clients.
//!
//! Each external service the pipeline talks to is modelled as one trait with
//! one method, so a deterministic test double can stand in for the network in
//! Cluster Engine and Synthesis Pipeline tests:
//!
//! | Trait | Production impl | Used by |
//! |-------|-----------------|---------|
//! | [`GenerativeBackend`]    | [`mistral::MistralChat`]        | synthesis (3 stages) |
//! | [`EmbeddingBackend`]     | [`mistral::MistralEmbeddings`]  | embedding phase |
//! | [`TranscriptionBackend`] | [`whisper::WhisperTranscriber`] | youtube source kind |
//! | [`CaptionBackend`]       | [`llava::OllamaCaptioner`]      | pdf image captioning |
//!
//! All production clients share the same retry policy: transient failures
//! (HTTP 429, 5xx, transport errors, timeouts) are retried with exponential
//! backoff up to `max_retries`; everything else fails immediately.

pub mod llava;
pub mod mistral;
pub mod whisper;

use crate::config::StudyGuideConfig;
use crate::error::StudyGenError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

/// One role-tagged message of a generation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }
}

/// Generative-text backend: role-tagged messages in, generated text out.
#[async_trait]
pub trait GenerativeBackend: Send + Sync {
    async fn generate(&self, messages: &[ChatMessage]) -> Result<String, StudyGenError>;
}

/// Embedding backend: one passage in, one fixed-length vector out.
///
/// Called once per passage — no batching, no caching. Repeated passages incur
/// repeated calls.
#[async_trait]
pub trait EmbeddingBackend: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, StudyGenError>;
}

/// Speech-to-text backend: audio file in, transcript text out. English only.
#[async_trait]
pub trait TranscriptionBackend: Send + Sync {
    async fn transcribe(&self, audio: &Path) -> Result<String, StudyGenError>;
}

/// Image-captioning backend: PNG bytes plus a descriptive prompt in, caption
/// text out.
#[async_trait]
pub trait CaptionBackend: Send + Sync {
    async fn caption(&self, image_png: &[u8], prompt: &str) -> Result<String, StudyGenError>;
}

/// The bundle of backends threaded through the pipeline.
///
/// Generation and embedding are always required; transcription and captioning
/// are optional and only consulted by the source kinds that need them.
#[derive(Clone)]
pub struct Backends {
    pub generator: Arc<dyn GenerativeBackend>,
    pub embedder: Arc<dyn EmbeddingBackend>,
    pub transcriber: Option<Arc<dyn TranscriptionBackend>>,
    pub captioner: Option<Arc<dyn CaptionBackend>>,
}

impl Backends {
    /// Wire up production clients from the configuration.
    ///
    /// The transcriber is only present when an OpenAI API key is configured;
    /// the captioner only needs a reachable Ollama host and is always built.
    pub fn from_config(config: &StudyGuideConfig) -> Result<Self, StudyGenError> {
        let mistral_key = config.mistral_api_key.as_deref().ok_or_else(|| {
            StudyGenError::ProviderNotConfigured {
                backend: "generation/embedding".into(),
                hint: "Set MISTRAL_API_KEY or StudyGuideConfig::mistral_api_key.".into(),
            }
        })?;

        let generator = mistral::MistralChat::new(mistral_key, config)?;
        let embedder = mistral::MistralEmbeddings::new(mistral_key, config)?;

        let transcriber = match config.openai_api_key.as_deref() {
            Some(key) => Some(
                Arc::new(whisper::WhisperTranscriber::new(key, config)?)
                    as Arc<dyn TranscriptionBackend>,
            ),
            None => None,
        };

        let captioner =
            Some(Arc::new(llava::OllamaCaptioner::new(config)?) as Arc<dyn CaptionBackend>);

        Ok(Self {
            generator: Arc::new(generator),
            embedder: Arc::new(embedder),
            transcriber,
            captioner,
        })
    }
}

impl std::fmt::Debug for Backends {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Backends")
            .field("generator", &"<dyn GenerativeBackend>")
            .field("embedder", &"<dyn EmbeddingBackend>")
            .field("transcriber", &self.transcriber.as_ref().map(|_| "<dyn TranscriptionBackend>"))
            .field("captioner", &self.captioner.as_ref().map(|_| "<dyn CaptionBackend>"))
            .finish()
    }
}

/// Decide whether a failed HTTP status is worth retrying.
pub(crate) fn should_retry_status(status: reqwest::StatusCode) -> bool {
    status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// Decide whether a transport-level error is worth retrying.
pub(crate) fn is_retryable_transport(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_request() || err.is_body() || err.is_decode()
}

/// Exponential backoff delay for the given 1-based attempt.
pub(crate) fn retry_backoff(base_ms: u64, attempt: u32) -> std::time::Duration {
    let capped = attempt.min(5);
    std::time::Duration::from_millis(base_ms.saturating_mul(1 << capped.saturating_sub(1)))
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_message_helpers() {
        let m = ChatMessage::user("hello");
        assert_eq!(m.role, ChatRole::User);
        assert_eq!(m.content, "hello");
        let s = ChatMessage::system("sys");
        assert_eq!(s.role, ChatRole::System);
    }

    #[test]
    fn chat_role_serialises_lowercase() {
        let m = ChatMessage::user("x");
        let json = serde_json::to_string(&m).unwrap();
        assert!(json.contains(r#""role":"user""#), "got: {json}");
    }

    #[test]
    fn backoff_doubles_and_caps() {
        assert_eq!(retry_backoff(500, 1).as_millis(), 500);
        assert_eq!(retry_backoff(500, 2).as_millis(), 1000);
        assert_eq!(retry_backoff(500, 3).as_millis(), 2000);
        // capped exponent: attempts beyond 5 stop growing
        assert_eq!(retry_backoff(500, 9), retry_backoff(500, 5));
    }

    #[test]
    fn from_config_without_key_is_provider_error() {
        let config = StudyGuideConfig::default();
        let err = Backends::from_config(&config).unwrap_err();
        assert!(matches!(err, StudyGenError::ProviderNotConfigured { .. }));
    }

    #[test]
    fn from_config_without_openai_key_has_no_transcriber() {
        let config = StudyGuideConfig::builder()
            .mistral_api_key("test-key")
            .build()
            .unwrap();
        let backends = Backends::from_config(&config).unwrap();
        assert!(backends.transcriber.is_none());
        assert!(backends.captioner.is_some());
    }
}
