//! Document assembly: cluster records to ordered markdown sections.
//!
//! Assembly is purely structural — it validates nothing about the upstream
//! text, adds one title section, and renders each record as a section with a
//! fixed block order (Topics Discussed, Notes, Sample Questions). The PDF
//! renderer itself is an external collaborator behind [`DocumentSink`]; the
//! crate ships [`MarkdownFileSink`], which writes the joined markdown
//! atomically.

use crate::error::StudyGenError;
use crate::output::{ClusterRecord, Section};
use async_trait::async_trait;
use std::path::Path;
use tracing::info;

/// Assemble records into ordered sections: one title section, then one
/// section per record in iteration order.
///
/// Count-preserving (`records.len() + 1` sections) and order-preserving.
pub fn assemble(title: &str, records: &[ClusterRecord]) -> Vec<Section> {
    let mut sections = Vec::with_capacity(records.len() + 1);
    sections.push(Section {
        title: title.to_string(),
        body: String::new(),
    });

    for (i, record) in records.iter().enumerate() {
        let mut body = String::new();
        body.push_str("### Topics Discussed\n");
        body.push_str(&record.topic_importance);
        body.push_str("\n\n### Notes\n");
        body.push_str(&record.lecture_note);
        body.push_str("\n\n### Sample Questions\n");
        body.push_str(&record.question_set);
        body.push('\n');

        sections.push(Section {
            title: format!("Section {:02}", i + 1),
            body,
        });
    }

    sections
}

/// Render sections to a single markdown document.
///
/// The first section is the document title (`#`); the rest are subsections
/// (`##`), blank-line separated.
pub fn render_markdown(sections: &[Section]) -> String {
    let mut out = String::new();
    for (i, section) in sections.iter().enumerate() {
        if i == 0 {
            out.push_str("# ");
        } else {
            out.push_str("## ");
        }
        out.push_str(&section.title);
        out.push('\n');
        if !section.body.is_empty() {
            out.push('\n');
            out.push_str(&section.body);
        }
        if i + 1 < sections.len() {
            out.push('\n');
        }
    }
    out
}

/// The output document sink: consumes ordered (title, body) markdown
/// sections and produces a document file at `dest`.
///
/// Implement this to plug in a paginated-PDF renderer; the pipeline treats
/// the sink as opaque.
#[async_trait]
pub trait DocumentSink: Send + Sync {
    async fn write(&self, sections: &[Section], dest: &Path) -> Result<(), StudyGenError>;
}

/// Default sink: the assembled markdown written as a single file.
///
/// Uses atomic write (temp file + rename) so a crash mid-write never leaves
/// a partial document behind.
pub struct MarkdownFileSink;

#[async_trait]
impl DocumentSink for MarkdownFileSink {
    async fn write(&self, sections: &[Section], dest: &Path) -> Result<(), StudyGenError> {
        let markdown = render_markdown(sections);

        if let Some(parent) = dest.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.map_err(|e| {
                    StudyGenError::OutputWriteFailed {
                        path: dest.to_path_buf(),
                        source: e,
                    }
                })?;
            }
        }

        let tmp_path = dest.with_extension("md.tmp");
        tokio::fs::write(&tmp_path, &markdown)
            .await
            .map_err(|e| StudyGenError::OutputWriteFailed {
                path: dest.to_path_buf(),
                source: e,
            })?;
        tokio::fs::rename(&tmp_path, dest)
            .await
            .map_err(|e| StudyGenError::OutputWriteFailed {
                path: dest.to_path_buf(),
                source: e,
            })?;

        info!("wrote {} section(s) to {}", sections.len(), dest.display());
        Ok(())
    }
}
