//! Top-level entry points: one source in, one study guide out.
//!
//! The pipeline is strictly phase-sequential — extraction completes before
//! embedding begins, embedding before clustering, clustering before
//! synthesis — because each phase's input is the previous phase's complete
//! output. Concurrency only exists *inside* the synthesis phase (bounded,
//! opt-in, cross-cluster).
//!
//! All state is scoped to one call: passages and vectors die with the run,
//! the cluster assignment is consumed by grouping, and the returned
//! [`StudyGuideOutput`] is the only thing that survives.

use crate::backend::Backends;
use crate::config::{SourceKind, StudyGuideConfig};
use crate::error::StudyGenError;
use crate::output::{GenerationStats, StudyGuideOutput};
use crate::pipeline::{assemble, cluster, embed, extract, synthesize};
use crate::pipeline::assemble::{DocumentSink, MarkdownFileSink};
use std::path::Path;
use std::time::Instant;
use tracing::info;

/// Generate a study guide from one source.
///
/// # Arguments
/// * `source` — the content itself (`SourceKind::Text`) or a URL/path
/// * `kind` — which extraction branch to use
/// * `config` — run configuration
/// * `backends` — backend bundle (see [`Backends::from_config`], or supply
///   test doubles)
///
/// # Errors
/// Fails fatally on unreachable sources, backend failures, and sources that
/// yield no usable passages. No partial document is produced on failure.
pub async fn generate(
    source: &str,
    kind: SourceKind,
    config: &StudyGuideConfig,
    backends: &Backends,
) -> Result<StudyGuideOutput, StudyGenError> {
    let total_start = Instant::now();
    info!("starting study-guide generation from '{kind}' source");

    // ── Step 1: Extract + filter ─────────────────────────────────────────
    let extraction = extract::extract(source, kind, config, backends).await?;
    let skipped_captions = extraction
        .captions
        .iter()
        .filter(|c| c.is_skipped())
        .count();
    let passages = extract::filter_passages(extraction.passages);
    if passages.is_empty() {
        return Err(StudyGenError::EmptySource);
    }
    info!("{} passage(s) after filtering", passages.len());

    // ── Step 2: Embed ────────────────────────────────────────────────────
    let embed_start = Instant::now();
    let vectors = embed::embed_passages(&backends.embedder, &passages).await?;
    let embed_duration_ms = embed_start.elapsed().as_millis() as u64;
    info!("embedded {} passage(s) in {}ms", vectors.len(), embed_duration_ms);

    // ── Step 3: Cluster ──────────────────────────────────────────────────
    let labels = cluster::mean_shift(&vectors, config.bandwidth);
    let cluster_count = labels.iter().collect::<std::collections::BTreeSet<_>>().len();
    info!("discovered {cluster_count} topic cluster(s)");

    // ── Step 4: Synthesise ───────────────────────────────────────────────
    let synthesis_start = Instant::now();
    let records =
        synthesize::synthesize_clusters(&backends.generator, &passages, &labels, config).await?;
    let synthesis_duration_ms = synthesis_start.elapsed().as_millis() as u64;

    // ── Step 5: Assemble ─────────────────────────────────────────────────
    let title = resolve_title(source, kind, config);
    let sections = assemble::assemble(&title, &records);
    let markdown = assemble::render_markdown(&sections);

    let stats = GenerationStats {
        passages: passages.len(),
        clusters: records.len(),
        skipped_captions,
        embed_duration_ms,
        synthesis_duration_ms,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
    };
    info!(
        "generation complete: {} cluster(s), {}ms total",
        stats.clusters, stats.total_duration_ms
    );

    Ok(StudyGuideOutput {
        markdown,
        sections,
        records,
        stats,
    })
}

/// Generate a study guide and hand it to a document sink.
pub async fn generate_to_sink(
    source: &str,
    kind: SourceKind,
    config: &StudyGuideConfig,
    backends: &Backends,
    sink: &dyn DocumentSink,
    dest: impl AsRef<Path>,
) -> Result<GenerationStats, StudyGenError> {
    let output = generate(source, kind, config, backends).await?;
    sink.write(&output.sections, dest.as_ref()).await?;
    Ok(output.stats)
}

/// Generate a study guide and write it as a markdown file.
pub async fn generate_to_file(
    source: &str,
    kind: SourceKind,
    config: &StudyGuideConfig,
    backends: &Backends,
    dest: impl AsRef<Path>,
) -> Result<GenerationStats, StudyGenError> {
    generate_to_sink(source, kind, config, backends, &MarkdownFileSink, dest).await
}

/// Pick the document title.
///
/// Path-like sources take their file stem; raw text has no meaningful
/// descriptor, so it falls straight to the default unless a title was
/// configured.
fn resolve_title(source: &str, kind: SourceKind, config: &StudyGuideConfig) -> String {
    match kind {
        SourceKind::Text => config
            .title
            .clone()
            .unwrap_or_else(|| "Content Summary".to_string()),
        _ => config.resolve_title(source),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_kind_defaults_to_content_summary() {
        let config = StudyGuideConfig::default();
        assert_eq!(
            resolve_title("Some long pasted text.", SourceKind::Text, &config),
            "Content Summary"
        );
    }

    #[test]
    fn pdf_kind_uses_file_stem() {
        let config = StudyGuideConfig::default();
        assert_eq!(
            resolve_title("Data/calculus_2.pdf", SourceKind::Pdf, &config),
            "calculus_2"
        );
    }

    #[test]
    fn explicit_title_wins_everywhere() {
        let config = StudyGuideConfig::builder().title("Week 5").build().unwrap();
        assert_eq!(resolve_title("x.pdf", SourceKind::Pdf, &config), "Week 5");
        assert_eq!(resolve_title("text", SourceKind::Text, &config), "Week 5");
    }
}
