//! Source extraction: turn one source descriptor into a passage sequence.
//!
//! The four source kinds all funnel into the same contract: produce text,
//! split it on blank-line boundaries, and let [`filter_passages`] drop the
//! blanks. Splitting is exact — `split("\n\n")` with no trimming — so a
//! passage keeps its leading/trailing spaces and the text branch is a pure
//! function of its input.

use crate::backend::Backends;
use crate::config::{SourceKind, StudyGuideConfig};
use crate::error::{CaptionOutcome, StudyGenError};
use crate::pipeline::{media, pdf, web};
use tracing::{debug, info};

/// Result of extracting one source: the passage sequence plus the per-page
/// caption outcomes of the pdf branch (empty for every other kind).
#[derive(Debug, Default)]
pub struct Extraction {
    pub passages: Vec<String>,
    pub captions: Vec<CaptionOutcome>,
}

/// Extract passages from a source.
///
/// Dispatches on `kind`; the unsupported-kind failure happens at
/// [`SourceKind`] parse time, before this function — and therefore before
/// any network or filesystem access.
pub async fn extract(
    source: &str,
    kind: SourceKind,
    config: &StudyGuideConfig,
    backends: &Backends,
) -> Result<Extraction, StudyGenError> {
    info!("extracting source kind '{}'", kind);

    let extraction = match kind {
        SourceKind::Text => Extraction {
            passages: split_passages(source),
            captions: Vec::new(),
        },
        SourceKind::Url => {
            let text = web::fetch_visible_text(source, config).await?;
            Extraction {
                passages: split_passages(&text),
                captions: Vec::new(),
            }
        }
        SourceKind::Youtube => {
            let transcript = media::transcribe_video(source, config, backends).await?;
            Extraction {
                passages: split_passages(&transcript),
                captions: Vec::new(),
            }
        }
        SourceKind::Pdf => {
            let extracted = pdf::extract_pdf(source, config, backends).await?;
            Extraction {
                passages: split_passages(&extracted.text),
                captions: extracted.captions,
            }
        }
    };

    debug!("extraction produced {} raw passages", extraction.passages.len());
    Ok(extraction)
}

/// Split text into passages on blank-line boundaries.
///
/// Exactly `split("\n\n")`: no passage is added, removed, or trimmed beyond
/// the split itself.
pub fn split_passages(text: &str) -> Vec<String> {
    text.split("\n\n").map(str::to_string).collect()
}

/// Retain a passage iff something other than whitespace remains in it.
///
/// Pure and total; order-preserving; idempotent.
pub fn filter_passages(passages: Vec<String>) -> Vec<String> {
    passages
        .into_iter()
        .filter(|p| !p.chars().all(char::is_whitespace))
        .collect()
}
