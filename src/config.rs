//! Configuration types for study-guide generation.
//!
//! All pipeline behaviour is controlled through [`StudyGuideConfig`], built
//! via its [`StudyGuideConfigBuilder`] and threaded explicitly through the
//! entry points. Nothing in the pipeline reads ambient process state, so two
//! runs with different configs can execute in the same process without
//! interfering.
//!
//! # Design choice: builder over constructor
//! A fifteen-field constructor is unreadable and breaks on every new field.
//! The builder lets callers set only what they care about and rely on
//! documented defaults for the rest.

use crate::error::StudyGenError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// The kind of source material handed to the pipeline.
///
/// Parsing an unrecognised kind string fails with
/// [`StudyGenError::UnsupportedInputKind`] before any I/O is attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// The source descriptor is itself the content.
    Text,
    /// The source descriptor is a web page URL.
    Url,
    /// The source descriptor is a video URL; the audio track is transcribed.
    Youtube,
    /// The source descriptor is a path to a PDF file.
    Pdf,
}

impl SourceKind {
    /// Stable lowercase name, matching the CLI/serde spelling.
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Text => "text",
            SourceKind::Url => "url",
            SourceKind::Youtube => "youtube",
            SourceKind::Pdf => "pdf",
        }
    }
}

impl FromStr for SourceKind {
    type Err = StudyGenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "text" => Ok(SourceKind::Text),
            "url" => Ok(SourceKind::Url),
            "youtube" => Ok(SourceKind::Youtube),
            "pdf" => Ok(SourceKind::Pdf),
            other => Err(StudyGenError::UnsupportedInputKind {
                kind: other.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration for one study-guide generation run.
///
/// Built via [`StudyGuideConfig::builder()`] or [`StudyGuideConfig::default()`].
///
/// # Example
/// ```rust
/// use studygen::StudyGuideConfig;
///
/// let config = StudyGuideConfig::builder()
///     .gen_model("mistral-large-latest")
///     .inter_call_delay_ms(250)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct StudyGuideConfig {
    /// Generative-text model used for topic scoring, note synthesis, and
    /// question generation. Default: "mistral-large-latest".
    pub gen_model: String,

    /// Embedding model. Default: "mistral-embed".
    ///
    /// Whatever dimensionality the model returns is accepted, but it must be
    /// uniform across all passages of one run; a mid-run dimension change is
    /// reported as an internal error.
    pub embedding_model: String,

    /// Speech-to-text model for the youtube source kind. Default: "whisper-1".
    pub transcription_model: String,

    /// Vision model used to caption embedded PDF images. Default: "llava".
    pub caption_model: String,

    /// API key for the generation + embedding backend.
    pub mistral_api_key: Option<String>,

    /// API key for the speech-to-text backend. When absent, the youtube
    /// source kind is unavailable and fails with `ProviderNotConfigured`.
    pub openai_api_key: Option<String>,

    /// Base URL of the local captioning host. Default: "http://localhost:11434".
    pub ollama_host: String,

    /// Route embedded PDF images through the captioning backend. Default: false.
    ///
    /// Captioning every diagram of an image-heavy PDF multiplies extraction
    /// time by the number of images, so it is opt-in.
    pub image_support: bool,

    /// Keep the downloaded audio artifact after transcription. Default: false.
    ///
    /// The artifact lives in a per-invocation temp directory and is removed
    /// on every exit path; setting this persists it and logs the path.
    pub keep_audio: bool,

    /// Maximum audio size accepted for transcription, in bytes.
    /// Default: 25 MB (the practical ceiling of the transcription backend).
    pub max_audio_bytes: u64,

    /// Fixed delay inserted between the generation calls of a cluster, in
    /// milliseconds. Default: 0 (disabled).
    ///
    /// A throughput policy for rate-limited backends, not a correctness
    /// requirement; per-cluster call ordering holds regardless.
    pub inter_call_delay_ms: u64,

    /// Number of clusters synthesised concurrently. Default: 1 (sequential).
    ///
    /// Within a cluster the three generation calls always run in order;
    /// across clusters no state is shared, so raising this is safe. Records
    /// are re-sorted by label afterwards, so document order is unaffected.
    pub cluster_concurrency: usize,

    /// Mean-shift bandwidth. Default: None (deterministic estimate from the
    /// input vectors).
    ///
    /// Smaller bandwidths split topics more aggressively; whether two
    /// near-duplicate topic clusters emerge is governed entirely by this
    /// value — the pipeline performs no semantic deduplication.
    pub bandwidth: Option<f32>,

    /// Sampling temperature forwarded to the generation backend, if set.
    pub temperature: Option<f32>,

    /// Maximum tokens per generation call, if set.
    pub max_tokens: Option<u32>,

    /// Retry attempts per backend call on transient failure. Default: 3.
    ///
    /// 429s and 5xxes are frequent under load and usually clear within
    /// seconds; permanent errors (bad key, 400) are not retried.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds (doubles per attempt). Default: 500.
    pub retry_backoff_ms: u64,

    /// Per-backend-call timeout in seconds. Default: 120.
    ///
    /// A timeout takes the same failure path as any transport error: retried,
    /// then surfaced as `BackendCallFailed`.
    pub request_timeout_secs: u64,

    /// Timeout for fetching a web page source, in seconds. Default: 30.
    pub fetch_timeout_secs: u64,

    /// Document title. Default: None (derived from the source descriptor's
    /// file stem, falling back to "Content Summary").
    pub title: Option<String>,
}

impl Default for StudyGuideConfig {
    fn default() -> Self {
        Self {
            gen_model: "mistral-large-latest".to_string(),
            embedding_model: "mistral-embed".to_string(),
            transcription_model: "whisper-1".to_string(),
            caption_model: "llava".to_string(),
            mistral_api_key: None,
            openai_api_key: None,
            ollama_host: "http://localhost:11434".to_string(),
            image_support: false,
            keep_audio: false,
            max_audio_bytes: 25 * 1024 * 1024,
            inter_call_delay_ms: 0,
            cluster_concurrency: 1,
            bandwidth: None,
            temperature: None,
            max_tokens: None,
            max_retries: 3,
            retry_backoff_ms: 500,
            request_timeout_secs: 120,
            fetch_timeout_secs: 30,
            title: None,
        }
    }
}

// Manual Debug: API keys must never end up in logs.
impl std::fmt::Debug for StudyGuideConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StudyGuideConfig")
            .field("gen_model", &self.gen_model)
            .field("embedding_model", &self.embedding_model)
            .field("transcription_model", &self.transcription_model)
            .field("caption_model", &self.caption_model)
            .field("mistral_api_key", &self.mistral_api_key.as_ref().map(|_| "<redacted>"))
            .field("openai_api_key", &self.openai_api_key.as_ref().map(|_| "<redacted>"))
            .field("ollama_host", &self.ollama_host)
            .field("image_support", &self.image_support)
            .field("keep_audio", &self.keep_audio)
            .field("max_audio_bytes", &self.max_audio_bytes)
            .field("inter_call_delay_ms", &self.inter_call_delay_ms)
            .field("cluster_concurrency", &self.cluster_concurrency)
            .field("bandwidth", &self.bandwidth)
            .field("max_retries", &self.max_retries)
            .field("title", &self.title)
            .finish()
    }
}

impl StudyGuideConfig {
    /// Create a new builder for `StudyGuideConfig`.
    pub fn builder() -> StudyGuideConfigBuilder {
        StudyGuideConfigBuilder {
            config: Self::default(),
        }
    }

    /// Resolve the document title for a given source descriptor.
    ///
    /// Explicit `title` wins; otherwise the descriptor's file stem (the part
    /// after the last `/`, before the first `.`); otherwise "Content Summary".
    pub fn resolve_title(&self, source: &str) -> String {
        if let Some(ref t) = self.title {
            return t.clone();
        }
        let stem = source
            .rsplit('/')
            .next()
            .unwrap_or("")
            .split('.')
            .next()
            .unwrap_or("")
            .trim();
        if stem.is_empty() || stem.len() > 120 {
            "Content Summary".to_string()
        } else {
            stem.to_string()
        }
    }
}

/// Builder for [`StudyGuideConfig`].
#[derive(Debug)]
pub struct StudyGuideConfigBuilder {
    config: StudyGuideConfig,
}

impl StudyGuideConfigBuilder {
    pub fn gen_model(mut self, model: impl Into<String>) -> Self {
        self.config.gen_model = model.into();
        self
    }

    pub fn embedding_model(mut self, model: impl Into<String>) -> Self {
        self.config.embedding_model = model.into();
        self
    }

    pub fn transcription_model(mut self, model: impl Into<String>) -> Self {
        self.config.transcription_model = model.into();
        self
    }

    pub fn caption_model(mut self, model: impl Into<String>) -> Self {
        self.config.caption_model = model.into();
        self
    }

    pub fn mistral_api_key(mut self, key: impl Into<String>) -> Self {
        self.config.mistral_api_key = Some(key.into());
        self
    }

    pub fn openai_api_key(mut self, key: impl Into<String>) -> Self {
        self.config.openai_api_key = Some(key.into());
        self
    }

    pub fn ollama_host(mut self, host: impl Into<String>) -> Self {
        self.config.ollama_host = host.into();
        self
    }

    pub fn image_support(mut self, v: bool) -> Self {
        self.config.image_support = v;
        self
    }

    pub fn keep_audio(mut self, v: bool) -> Self {
        self.config.keep_audio = v;
        self
    }

    pub fn max_audio_bytes(mut self, bytes: u64) -> Self {
        self.config.max_audio_bytes = bytes;
        self
    }

    pub fn inter_call_delay_ms(mut self, ms: u64) -> Self {
        self.config.inter_call_delay_ms = ms;
        self
    }

    pub fn cluster_concurrency(mut self, n: usize) -> Self {
        self.config.cluster_concurrency = n.max(1);
        self
    }

    pub fn bandwidth(mut self, b: f32) -> Self {
        self.config.bandwidth = Some(b);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = Some(t.clamp(0.0, 2.0));
        self
    }

    pub fn max_tokens(mut self, n: u32) -> Self {
        self.config.max_tokens = Some(n);
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = secs.max(1);
        self
    }

    pub fn fetch_timeout_secs(mut self, secs: u64) -> Self {
        self.config.fetch_timeout_secs = secs.max(1);
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.config.title = Some(title.into());
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<StudyGuideConfig, StudyGenError> {
        let c = &self.config;
        if c.gen_model.trim().is_empty() {
            return Err(StudyGenError::InvalidConfig(
                "gen_model must not be empty".into(),
            ));
        }
        if c.embedding_model.trim().is_empty() {
            return Err(StudyGenError::InvalidConfig(
                "embedding_model must not be empty".into(),
            ));
        }
        if let Some(b) = c.bandwidth {
            if !b.is_finite() || b < 0.0 {
                return Err(StudyGenError::InvalidConfig(format!(
                    "bandwidth must be a finite non-negative number, got {b}"
                )));
            }
        }
        if c.max_audio_bytes == 0 {
            return Err(StudyGenError::InvalidConfig(
                "max_audio_bytes must be ≥ 1".into(),
            ));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_kind_parses_supported_set() {
        assert_eq!("text".parse::<SourceKind>().unwrap(), SourceKind::Text);
        assert_eq!("URL".parse::<SourceKind>().unwrap(), SourceKind::Url);
        assert_eq!(
            " youtube ".parse::<SourceKind>().unwrap(),
            SourceKind::Youtube
        );
        assert_eq!("pdf".parse::<SourceKind>().unwrap(), SourceKind::Pdf);
    }

    #[test]
    fn source_kind_rejects_unknown_kind() {
        let err = "audio".parse::<SourceKind>().unwrap_err();
        assert!(matches!(
            err,
            StudyGenError::UnsupportedInputKind { kind } if kind == "audio"
        ));
    }

    #[test]
    fn builder_defaults() {
        let c = StudyGuideConfig::builder().build().unwrap();
        assert_eq!(c.gen_model, "mistral-large-latest");
        assert_eq!(c.embedding_model, "mistral-embed");
        assert_eq!(c.max_audio_bytes, 25 * 1024 * 1024);
        assert_eq!(c.inter_call_delay_ms, 0);
        assert_eq!(c.cluster_concurrency, 1);
        assert!(c.bandwidth.is_none());
        assert!(!c.image_support);
        assert!(!c.keep_audio);
    }

    #[test]
    fn builder_rejects_negative_bandwidth() {
        let err = StudyGuideConfig::builder().bandwidth(-0.5).build();
        assert!(matches!(err, Err(StudyGenError::InvalidConfig(_))));
    }

    #[test]
    fn concurrency_clamped_to_one() {
        let c = StudyGuideConfig::builder()
            .cluster_concurrency(0)
            .build()
            .unwrap();
        assert_eq!(c.cluster_concurrency, 1);
    }

    #[test]
    fn title_resolution() {
        let c = StudyGuideConfig::default();
        assert_eq!(c.resolve_title("Data/linear_algebra.pdf"), "linear_algebra");
        assert_eq!(c.resolve_title(""), "Content Summary");

        let c = StudyGuideConfig::builder().title("Week 3").build().unwrap();
        assert_eq!(c.resolve_title("Data/notes.pdf"), "Week 3");
    }
}
