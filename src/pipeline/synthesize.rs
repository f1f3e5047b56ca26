//! Synthesis pipeline: three ordered generation calls per topic cluster.
//!
//! Per cluster the call order is fixed — topic importance, then lecture
//! note, then question set — because the question prompt embeds the first
//! two replies. The order is a data dependency, not a style choice, and the
//! tests pin it.
//!
//! Clusters themselves share no state, so they may be processed with bounded
//! concurrency (`cluster_concurrency`, default 1). Grouping uses a `BTreeMap`
//! keyed by label, so iteration — and with it record order and document
//! section order — is ascending-by-label and reproducible for a fixed
//! clustering output.

use crate::backend::{ChatMessage, GenerativeBackend};
use crate::config::StudyGuideConfig;
use crate::error::StudyGenError;
use crate::output::ClusterRecord;
use crate::prompts;
use futures::stream::{self, StreamExt};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Group passages by cluster label, preserving passage-discovery order
/// within each group.
///
/// `labels` must be 1:1 positional with `passages`.
pub fn group_by_label<'a>(
    passages: &'a [String],
    labels: &[usize],
) -> Result<BTreeMap<usize, Vec<&'a str>>, StudyGenError> {
    if passages.len() != labels.len() {
        return Err(StudyGenError::Internal(format!(
            "cluster assignment is not total: {} passages, {} labels",
            passages.len(),
            labels.len()
        )));
    }
    let mut groups: BTreeMap<usize, Vec<&str>> = BTreeMap::new();
    for (passage, &label) in passages.iter().zip(labels) {
        groups.entry(label).or_default().push(passage.as_str());
    }
    Ok(groups)
}

/// Run the three-stage generation for every cluster.
///
/// Returns records in ascending label order. A generation failure (after the
/// backend client's retries) aborts the whole run; clusters already
/// synthesised are discarded with it.
pub async fn synthesize_clusters(
    generator: &Arc<dyn GenerativeBackend>,
    passages: &[String],
    labels: &[usize],
    config: &StudyGuideConfig,
) -> Result<Vec<ClusterRecord>, StudyGenError> {
    let groups = group_by_label(passages, labels)?;
    let total = groups.len();
    info!("synthesising {total} cluster(s)");

    // `buffered` bounds concurrency while preserving the BTreeMap's
    // ascending-label order in the output.
    let records: Vec<Result<ClusterRecord, StudyGenError>> = stream::iter(
        groups
            .into_iter()
            .map(|(label, cluster)| synthesize_one(generator, label, cluster, config)),
    )
    .buffered(config.cluster_concurrency.max(1))
    .collect()
    .await;

    records.into_iter().collect()
}

/// The three ordered calls for one cluster.
async fn synthesize_one(
    generator: &Arc<dyn GenerativeBackend>,
    label: usize,
    cluster: Vec<&str>,
    config: &StudyGuideConfig,
) -> Result<ClusterRecord, StudyGenError> {
    let content = cluster.join("\n");
    debug!("cluster {label}: {} passage(s), {} chars", cluster.len(), content.len());

    let topic_importance = generator
        .generate(&[ChatMessage::user(prompts::topic_prompt(&content))])
        .await?;
    pace(config).await;

    let lecture_note = generator
        .generate(&[ChatMessage::user(prompts::note_prompt(&content))])
        .await?;
    pace(config).await;

    let question_set = generator
        .generate(&[ChatMessage::user(prompts::question_prompt(
            &lecture_note,
            &topic_importance,
        ))])
        .await?;

    debug!("cluster {label}: synthesis complete");
    Ok(ClusterRecord {
        label,
        topic_importance,
        lecture_note,
        question_set,
    })
}

/// Optional fixed inter-call delay — a rate-limit courtesy, disabled at 0.
async fn pace(config: &StudyGuideConfig) {
    if config.inter_call_delay_ms > 0 {
        tokio::time::sleep(Duration::from_millis(config.inter_call_delay_ms)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Records every prompt it receives and answers with a stage-tagged reply.
    struct ScriptedGenerator {
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedGenerator {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                prompts: Mutex::new(Vec::new()),
            })
        }

        fn stage_of(prompt: &str) -> &'static str {
            if prompt.contains("importance score") {
                "topic"
            } else if prompt.contains("lecture notes") && prompt.contains("Clean the contents") {
                "note"
            } else {
                "question"
            }
        }
    }

    #[async_trait]
    impl GenerativeBackend for ScriptedGenerator {
        async fn generate(&self, messages: &[ChatMessage]) -> Result<String, StudyGenError> {
            let prompt = messages.last().unwrap().content.clone();
            let stage = Self::stage_of(&prompt);
            self.prompts.lock().unwrap().push(prompt);
            Ok(format!("{stage}-reply"))
        }
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn grouping_preserves_discovery_order_and_sorts_labels() {
        let passages = strings(&["a", "b", "c", "d"]);
        let labels = vec![1, 0, 1, 0];
        let groups = group_by_label(&passages, &labels).unwrap();

        let keys: Vec<usize> = groups.keys().copied().collect();
        assert_eq!(keys, vec![0, 1]);
        assert_eq!(groups[&0], vec!["b", "d"]);
        assert_eq!(groups[&1], vec!["a", "c"]);
    }

    #[test]
    fn mismatched_assignment_is_internal_error() {
        let passages = strings(&["a", "b"]);
        let err = group_by_label(&passages, &[0]).unwrap_err();
        assert!(matches!(err, StudyGenError::Internal(_)));
    }

    #[tokio::test]
    async fn three_calls_per_cluster_in_stage_order() {
        let generator = ScriptedGenerator::new();
        let dyn_gen: Arc<dyn GenerativeBackend> = generator.clone();
        let config = StudyGuideConfig::default();

        let passages = strings(&["vectors add", "spans"]);
        let records = synthesize_clusters(&dyn_gen, &passages, &[0, 0], &config)
            .await
            .unwrap();

        let prompts = generator.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 3);
        assert_eq!(ScriptedGenerator::stage_of(&prompts[0]), "topic");
        assert_eq!(ScriptedGenerator::stage_of(&prompts[1]), "note");
        assert_eq!(ScriptedGenerator::stage_of(&prompts[2]), "question");

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].topic_importance, "topic-reply");
        assert_eq!(records[0].lecture_note, "note-reply");
        assert_eq!(records[0].question_set, "question-reply");
    }

    #[tokio::test]
    async fn question_prompt_embeds_both_prior_replies() {
        let generator = ScriptedGenerator::new();
        let dyn_gen: Arc<dyn GenerativeBackend> = generator.clone();
        let config = StudyGuideConfig::default();

        let passages = strings(&["content"]);
        synthesize_clusters(&dyn_gen, &passages, &[0], &config)
            .await
            .unwrap();

        let prompts = generator.prompts.lock().unwrap();
        let question = &prompts[2];
        // the question request can only be issued once both replies exist
        assert!(question.contains("note-reply"));
        assert!(question.contains("topic-reply"));
    }

    #[tokio::test]
    async fn cluster_content_is_newline_joined_in_discovery_order() {
        let generator = ScriptedGenerator::new();
        let dyn_gen: Arc<dyn GenerativeBackend> = generator.clone();
        let config = StudyGuideConfig::default();

        let passages = strings(&["first", "other-cluster", "second"]);
        synthesize_clusters(&dyn_gen, &passages, &[0, 1, 0], &config)
            .await
            .unwrap();

        let prompts = generator.prompts.lock().unwrap();
        assert!(prompts[0].contains("first\nsecond"));
    }

    #[tokio::test]
    async fn records_come_back_in_ascending_label_order() {
        let generator = ScriptedGenerator::new();
        let dyn_gen: Arc<dyn GenerativeBackend> = generator.clone();
        let config = StudyGuideConfig::builder()
            .cluster_concurrency(4)
            .build()
            .unwrap();

        let passages = strings(&["a", "b", "c"]);
        let records = synthesize_clusters(&dyn_gen, &passages, &[2, 0, 1], &config)
            .await
            .unwrap();

        let labels: Vec<usize> = records.iter().map(|r| r.label).collect();
        assert_eq!(labels, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn generation_failure_aborts_the_run() {
        struct FailingGenerator;

        #[async_trait]
        impl GenerativeBackend for FailingGenerator {
            async fn generate(&self, _m: &[ChatMessage]) -> Result<String, StudyGenError> {
                Err(StudyGenError::backend("generation", "boom"))
            }
        }

        let dyn_gen: Arc<dyn GenerativeBackend> = Arc::new(FailingGenerator);
        let config = StudyGuideConfig::default();
        let passages = strings(&["a"]);
        let err = synthesize_clusters(&dyn_gen, &passages, &[0], &config)
            .await
            .unwrap_err();
        assert!(matches!(err, StudyGenError::BackendCallFailed { .. }));
    }
}
