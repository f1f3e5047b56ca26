//! Speech-to-text client for the youtube source kind.
//!
//! Talks to the OpenAI audio-transcriptions endpoint with a multipart upload.
//! Language scope is English; the caller enforces the audio size ceiling
//! before the upload is attempted, so an oversized file never leaves the
//! machine.

use crate::backend::{is_retryable_transport, retry_backoff, should_retry_status, TranscriptionBackend};
use crate::config::StudyGuideConfig;
use crate::error::StudyGenError;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};

const TRANSCRIPTIONS_URL: &str = "https://api.openai.com/v1/audio/transcriptions";

/// Transcription client backed by the whisper family of models.
#[derive(Clone, Debug)]
pub struct WhisperTranscriber {
    client: reqwest::Client,
    api_key: String,
    model: String,
    max_retries: u32,
    backoff_ms: u64,
}

#[derive(Deserialize)]
struct TranscriptionResponse {
    text: String,
}

impl WhisperTranscriber {
    pub fn new(api_key: &str, config: &StudyGuideConfig) -> Result<Self, StudyGenError> {
        if api_key.trim().is_empty() {
            return Err(StudyGenError::ProviderNotConfigured {
                backend: "transcription".into(),
                hint: "The configured API key is empty.".into(),
            });
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| StudyGenError::Internal(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            api_key: api_key.trim().to_string(),
            model: config.transcription_model.clone(),
            max_retries: config.max_retries,
            backoff_ms: config.retry_backoff_ms,
        })
    }

    fn build_form(&self, audio: Vec<u8>, file_name: String) -> Result<Form, StudyGenError> {
        let part = Part::bytes(audio)
            .file_name(file_name)
            .mime_str("audio/mp4")
            .map_err(|e| StudyGenError::TranscriptionFailed {
                detail: format!("invalid multipart payload: {e}"),
            })?;
        Ok(Form::new()
            .text("model", self.model.clone())
            .text("language", "en")
            .text("response_format", "json")
            .part("file", part))
    }
}

#[async_trait]
impl TranscriptionBackend for WhisperTranscriber {
    async fn transcribe(&self, audio: &Path) -> Result<String, StudyGenError> {
        let bytes = tokio::fs::read(audio)
            .await
            .map_err(|e| StudyGenError::TranscriptionFailed {
                detail: format!("failed to read audio '{}': {e}", audio.display()),
            })?;
        let file_name = audio
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "audio.m4a".to_string());
        debug!("uploading {} bytes of audio for transcription", bytes.len());

        // Multipart forms are consumed on send; rebuild per attempt.
        let mut last_err = String::new();
        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = retry_backoff(self.backoff_ms, attempt);
                warn!(
                    "transcription: retry {}/{} after {}ms — {}",
                    attempt,
                    self.max_retries,
                    delay.as_millis(),
                    last_err
                );
                tokio::time::sleep(delay).await;
            }

            let form = self.build_form(bytes.clone(), file_name.clone())?;
            let result = self
                .client
                .post(TRANSCRIPTIONS_URL)
                .bearer_auth(&self.api_key)
                .multipart(form)
                .send()
                .await;

            match result {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        let parsed: TranscriptionResponse = resp.json().await.map_err(|e| {
                            StudyGenError::TranscriptionFailed {
                                detail: format!("bad response: {e}"),
                            }
                        })?;
                        return Ok(parsed.text);
                    }
                    let text = resp
                        .text()
                        .await
                        .unwrap_or_else(|_| "<body unavailable>".to_string());
                    last_err = format!("HTTP {status}: {text}");
                    if !should_retry_status(status) {
                        return Err(StudyGenError::TranscriptionFailed { detail: last_err });
                    }
                }
                Err(e) => {
                    last_err = e.to_string();
                    if !is_retryable_transport(&e) {
                        return Err(StudyGenError::TranscriptionFailed { detail: last_err });
                    }
                }
            }
        }

        Err(StudyGenError::TranscriptionFailed {
            detail: format!("gave up after {} retries: {last_err}", self.max_retries),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_parses() {
        let json = r#"{"text":"hello world"}"#;
        let resp: TranscriptionResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.text, "hello world");
    }

    #[test]
    fn empty_key_rejected() {
        let config = StudyGuideConfig::default();
        let err = WhisperTranscriber::new("", &config).unwrap_err();
        assert!(matches!(err, StudyGenError::ProviderNotConfigured { .. }));
    }

    #[tokio::test]
    async fn missing_audio_file_is_transcription_failure() {
        let config = StudyGuideConfig::default();
        let t = WhisperTranscriber::new("test-key", &config).unwrap();
        let err = t
            .transcribe(Path::new("/definitely/not/here.m4a"))
            .await
            .unwrap_err();
        assert!(matches!(err, StudyGenError::TranscriptionFailed { .. }));
    }
}
