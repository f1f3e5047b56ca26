//! Error types for the studygen library.
//!
//! Two distinct kinds of failure exist:
//!
//! * [`StudyGenError`] — **Fatal**: the run cannot produce a document
//!   (unsupported input kind, unreachable source, backend failure). Returned
//!   as `Err(StudyGenError)` from the top-level `generate*` functions. No
//!   partial document is emitted on a fatal error.
//!
//! * [`CaptionOutcome`] — **Non-fatal**: a single PDF page's image could not
//!   be captioned. Extraction continues with that page's native text only;
//!   the skip is recorded so callers and tests can observe the degraded path
//!   instead of it disappearing into a silent catch-all.
//!
//! Input validation failures (`UnsupportedInputKind`, `InvalidConfig`) are
//! surfaced before any network or filesystem access is attempted.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the studygen library.
#[derive(Debug, Error)]
pub enum StudyGenError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The content-kind selector is not one of the supported sources.
    #[error("Unsupported input kind '{kind}'. Supported kinds: text, url, youtube, pdf.")]
    UnsupportedInputKind { kind: String },

    /// A PDF path was given but no file exists there.
    #[error("Source file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    // ── Extraction errors ─────────────────────────────────────────────────
    /// Fetching or parsing a source failed during extraction.
    #[error("Failed to read source '{source_name}': {reason}")]
    SourceUnreachable { source_name: String, reason: String },

    /// Audio download, size validation, or speech-to-text failed.
    #[error("Transcription failed: {detail}")]
    TranscriptionFailed { detail: String },

    // ── Backend errors ────────────────────────────────────────────────────
    /// A required backend has no credentials or endpoint configured.
    #[error("Backend '{backend}' is not configured.\n{hint}")]
    ProviderNotConfigured { backend: String, hint: String },

    /// An embedding or generation call failed after all retries.
    ///
    /// This aborts the whole run, including clusters already synthesised;
    /// no partial document is emitted.
    #[error("{backend} backend call failed: {detail}")]
    BackendCallFailed { backend: String, detail: String },

    // ── Pipeline errors ───────────────────────────────────────────────────
    /// No passage survived extraction and filtering; there is nothing to
    /// embed, cluster, or synthesise.
    #[error("Source produced no usable passages after filtering")]
    EmptySource,

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output document.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error (dimension mismatch, task join failure).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl StudyGenError {
    /// Shorthand for [`StudyGenError::BackendCallFailed`].
    pub fn backend(backend: impl Into<String>, detail: impl ToString) -> Self {
        Self::BackendCallFailed {
            backend: backend.into(),
            detail: detail.to_string(),
        }
    }
}

/// Outcome of captioning the embedded images of a single PDF page.
///
/// Captioning is best-effort: a failing page degrades to text-only content
/// rather than aborting extraction. Both arms carry the 0-based page index.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum CaptionOutcome {
    /// All images on the page were captioned; text was appended to the page.
    Captioned { page: usize, captions: usize },
    /// The page's images were dropped. The page keeps its native text.
    Skipped { page: usize, reason: String },
}

impl CaptionOutcome {
    /// True when this page's image content was dropped.
    pub fn is_skipped(&self) -> bool {
        matches!(self, CaptionOutcome::Skipped { .. })
    }
}
