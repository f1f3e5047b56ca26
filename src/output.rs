//! Output types: per-cluster records, document sections, and run statistics.

use serde::{Deserialize, Serialize};

/// The synthesised content of one topic cluster.
///
/// The three fields are populated strictly in declaration order: the question
/// set is generated from the other two, so it can never exist without them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterRecord {
    /// Cluster label assigned by the cluster engine. An opaque identifier —
    /// labels carry no meaning beyond grouping and are not stable across runs.
    pub label: usize,
    /// Ranked topic list with importance scores, as free-form text.
    pub topic_importance: String,
    /// Synthesised lecture notes, bounded to the cluster's passages.
    pub lecture_note: String,
    /// Assessment questions weighted by topic importance, without answers.
    pub question_set: String,
}

/// One markdown section of the assembled document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    /// Section heading line, without the leading `#` markers.
    pub title: String,
    /// Section body markdown.
    pub body: String,
}

/// Statistics for one generation run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationStats {
    /// Passages surviving extraction + filtering.
    pub passages: usize,
    /// Distinct topic clusters discovered.
    pub clusters: usize,
    /// PDF pages whose image content was dropped (degraded, non-fatal).
    pub skipped_captions: usize,
    /// Wall-clock time spent in the embedding phase.
    pub embed_duration_ms: u64,
    /// Wall-clock time spent in the synthesis phase.
    pub synthesis_duration_ms: u64,
    /// Total wall-clock time of the run.
    pub total_duration_ms: u64,
}

/// The terminal artifact of a generation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudyGuideOutput {
    /// The full document as markdown.
    pub markdown: String,
    /// The document's ordered sections (title section first, then one per
    /// cluster record).
    pub sections: Vec<Section>,
    /// Per-cluster records in document order (ascending label).
    pub records: Vec<ClusterRecord>,
    /// Run statistics.
    pub stats: GenerationStats,
}
