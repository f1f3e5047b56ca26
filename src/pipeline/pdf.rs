//! PDF extraction: per-page native text plus captions for embedded images.
//!
//! ## Why spawn_blocking?
//!
//! The `pdfium-render` crate wraps the pdfium C++ library, which uses
//! thread-local state internally and is not safe to call from async contexts.
//! `tokio::task::spawn_blocking` moves document parsing onto the blocking
//! thread pool so the Tokio workers never stall on it. The captioning phase
//! that follows is pure network I/O and runs back on the async side.
//!
//! ## Captioning is best-effort
//!
//! A page whose images cannot be captioned degrades to text-only content and
//! the run continues; the skip is recorded as an explicit
//! [`CaptionOutcome::Skipped`] so callers can see what was lost. Page 0
//! images are never captioned — first-page images are covers and logos far
//! more often than diagrams.

use crate::backend::{Backends, CaptionBackend};
use crate::config::StudyGuideConfig;
use crate::error::{CaptionOutcome, StudyGenError};
use crate::prompts;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Extraction result: the document text (pages joined with blank lines) and
/// the per-page caption outcomes for pages that carried images.
#[derive(Debug)]
pub struct PdfExtraction {
    pub text: String,
    pub captions: Vec<CaptionOutcome>,
}

/// One page's contribution: native text plus PNG-encoded embedded images.
struct PageContent {
    index: usize,
    text: String,
    images: Vec<Vec<u8>>,
}

/// Extract a PDF's content.
///
/// When `config.image_support` is set and a captioning backend is available,
/// each embedded raster image (pages 1+) is routed through it and the caption
/// appended to that page's text.
pub async fn extract_pdf(
    path_str: &str,
    config: &StudyGuideConfig,
    backends: &Backends,
) -> Result<PdfExtraction, StudyGenError> {
    let path = PathBuf::from(path_str);
    if !path.exists() {
        return Err(StudyGenError::FileNotFound { path });
    }
    validate_magic(&path)?;

    let document_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path_str.to_string());

    let want_images = config.image_support;
    let blocking_path = path.clone();
    let pages = tokio::task::spawn_blocking(move || {
        extract_pages_blocking(&blocking_path, want_images)
    })
    .await
    .map_err(|e| StudyGenError::Internal(format!("PDF extraction task panicked: {e}")))??;

    info!("extracted {} pages from '{}'", pages.len(), document_name);

    let captioner = if config.image_support {
        backends.captioner.as_ref()
    } else {
        None
    };
    let (texts, captions) = caption_pages(pages, captioner, &document_name).await;

    Ok(PdfExtraction {
        text: texts.join("\n\n"),
        captions,
    })
}

/// Reject files that are not PDFs before pdfium ever sees them.
fn validate_magic(path: &Path) -> Result<(), StudyGenError> {
    use std::io::Read;
    let mut magic = [0u8; 4];
    let mut file = std::fs::File::open(path).map_err(|e| StudyGenError::SourceUnreachable {
        source_name: path.display().to_string(),
        reason: e.to_string(),
    })?;
    if file.read_exact(&mut magic).is_ok() && &magic != b"%PDF" {
        return Err(StudyGenError::SourceUnreachable {
            source_name: path.display().to_string(),
            reason: format!("not a PDF (first bytes: {magic:?})"),
        });
    }
    Ok(())
}

/// Blocking pdfium pass: page text and, when wanted, raw embedded images
/// PNG-encoded for the caption payload. Page 0 images are always skipped.
fn extract_pages_blocking(
    pdf_path: &Path,
    want_images: bool,
) -> Result<Vec<PageContent>, StudyGenError> {
    let pdfium = Pdfium::default();

    let document =
        pdfium
            .load_pdf_from_file(pdf_path, None)
            .map_err(|e| StudyGenError::SourceUnreachable {
                source_name: pdf_path.display().to_string(),
                reason: format!("{e:?}"),
            })?;

    let pages = document.pages();
    let total = pages.len() as usize;
    let mut out = Vec::with_capacity(total);

    for idx in 0..total {
        let page = pages
            .get(idx as u16)
            .map_err(|e| StudyGenError::SourceUnreachable {
                source_name: pdf_path.display().to_string(),
                reason: format!("page {}: {e:?}", idx + 1),
            })?;

        let text = page.text().map(|t| t.all()).unwrap_or_default();

        let mut images = Vec::new();
        if want_images && idx > 0 {
            for object in page.objects().iter() {
                if let Some(image_object) = object.as_image_object() {
                    match image_object.get_raw_image() {
                        Ok(img) => match encode_png(&img) {
                            Ok(png) => images.push(png),
                            Err(e) => {
                                warn!("page {}: image encode failed: {e}", idx + 1);
                            }
                        },
                        Err(e) => {
                            warn!("page {}: image decode failed: {e:?}", idx + 1);
                        }
                    }
                }
            }
        }

        debug!(
            "page {}: {} chars of text, {} image(s)",
            idx + 1,
            text.len(),
            images.len()
        );
        out.push(PageContent { index: idx, text, images });
    }

    Ok(out)
}

/// PNG-encode an extracted image for the caption request body.
///
/// PNG over JPEG: lossless, and diagram line-work survives re-encoding.
fn encode_png(img: &DynamicImage) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;
    Ok(buf)
}

/// Caption each page's images and append the caption text to the page.
///
/// One failing image skips the rest of that page's images (the page keeps
/// its native text); other pages are unaffected. Pages without images never
/// touch the backend.
async fn caption_pages(
    pages: Vec<PageContent>,
    captioner: Option<&Arc<dyn CaptionBackend>>,
    document_name: &str,
) -> (Vec<String>, Vec<CaptionOutcome>) {
    let prompt = prompts::caption_prompt(document_name);
    let mut texts = Vec::with_capacity(pages.len());
    let mut outcomes = Vec::new();

    for page in pages {
        let mut text = page.text;

        if !page.images.is_empty() {
            match captioner {
                Some(captioner) => {
                    let mut captioned = 0usize;
                    let total = page.images.len();
                    for png in &page.images {
                        match captioner.caption(png, &prompt).await {
                            Ok(caption) => {
                                text.push('\n');
                                text.push_str(&caption);
                                captioned += 1;
                            }
                            Err(e) => {
                                warn!(
                                    "page {}: captioning failed, continuing text-only: {e}",
                                    page.index + 1
                                );
                                outcomes.push(CaptionOutcome::Skipped {
                                    page: page.index,
                                    reason: e.to_string(),
                                });
                                break;
                            }
                        }
                    }
                    if captioned == total {
                        outcomes.push(CaptionOutcome::Captioned {
                            page: page.index,
                            captions: captioned,
                        });
                    }
                }
                None => {
                    outcomes.push(CaptionOutcome::Skipped {
                        page: page.index,
                        reason: "captioning backend not configured".to_string(),
                    });
                }
            }
        }

        texts.push(text);
    }

    (texts, outcomes)
}
