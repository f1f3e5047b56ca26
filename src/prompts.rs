//! Prompt templates for the three-stage synthesis pipeline and for PDF image
//! captioning.
//!
//! Centralising every prompt here serves two purposes:
//!
//! 1. **Single source of truth** — tuning the pipeline's behaviour (scoring
//!    emphasis, question mix, caption style) means editing exactly one place.
//!
//! 2. **Testability** — unit tests can assert on the assembled prompts
//!    without a live backend, so a template regression is caught before it
//!    burns tokens.
//!
//! Templates use `{placeholder}` markers filled by the `*_prompt` functions;
//! the raw constants are exported for callers that want to inspect them.

/// Stage 1: identify the topics discussed in a cluster and score them.
///
/// `{content}` is the newline-joined passage text of one cluster. The reply
/// is consumed as opaque text — no schema is imposed on the score format.
pub const TOPIC_IMPORTANCE_TEMPLATE: &str = r#"Given the following excerpts compiled from textbooks and lecture transcripts on a subject.

{content}

Identify the core topics discussed and assign each an importance score."#;

/// Stage 2: synthesise cleaned lecture notes for a cluster.
///
/// The closing instruction is the prompt-level contract that the backend must
/// not introduce material beyond the supplied excerpts. The backend is
/// expected, not guaranteed, to honour it.
pub const LECTURE_NOTE_TEMPLATE: &str = r#"Given the following excerpts compiled from textbooks and lecture transcripts on a subject.

{content}

Clean the contents and write comprehensive lecture notes on the topics being covered. Stick strictly to the contents."#;

/// Stage 3: generate assessment questions from the two prior outputs.
///
/// `{lecture_notes}` and `{topic_importance}` are the stage-2 and stage-1
/// replies for the same cluster, so this prompt can only be assembled after
/// both have arrived.
pub const QUESTION_SET_TEMPLATE: &str = r#"Given the following lecture notes.

<lecture_notes>
{lecture_notes}
</lecture_notes>

The importance of each topic discussed in the lecture is given below.

<topic_importance>
{topic_importance}
</topic_importance>

You are a teacher tasked with setting a large number of questions for an upcoming examination. The number of questions per topic should depend upon the topic importance.
The questions should include conceptual, reasoning and application level questions. Do not generate answers. Generate questions, not a question distribution."#;

/// Caption prompt for an embedded PDF diagram.
///
/// `{name}` is the source document's file name, giving the vision model
/// context for what the diagram belongs to.
pub const IMAGE_CAPTION_TEMPLATE: &str =
    "Provide a descriptive summary of the diagram provided. The diagram is extracted from the document {name}.";

/// Fill the stage-1 topic-importance prompt for one cluster.
pub fn topic_prompt(content: &str) -> String {
    TOPIC_IMPORTANCE_TEMPLATE.replace("{content}", content)
}

/// Fill the stage-2 lecture-note prompt for one cluster.
pub fn note_prompt(content: &str) -> String {
    LECTURE_NOTE_TEMPLATE.replace("{content}", content)
}

/// Fill the stage-3 question-set prompt from the two prior stage outputs.
pub fn question_prompt(lecture_notes: &str, topic_importance: &str) -> String {
    QUESTION_SET_TEMPLATE
        .replace("{lecture_notes}", lecture_notes)
        .replace("{topic_importance}", topic_importance)
}

/// Fill the caption prompt with the source document's name.
pub fn caption_prompt(document_name: &str) -> String {
    IMAGE_CAPTION_TEMPLATE.replace("{name}", document_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topic_prompt_embeds_content() {
        let p = topic_prompt("Eigenvalues and eigenvectors.");
        assert!(p.contains("Eigenvalues and eigenvectors."));
        assert!(!p.contains("{content}"));
        assert!(p.contains("importance score"));
    }

    #[test]
    fn note_prompt_carries_bounding_contract() {
        let p = note_prompt("anything");
        assert!(p.contains("Stick strictly to the contents"));
    }

    #[test]
    fn question_prompt_embeds_both_stages() {
        let p = question_prompt("NOTES", "TOPICS");
        assert!(p.contains("<lecture_notes>\nNOTES\n</lecture_notes>"));
        assert!(p.contains("<topic_importance>\nTOPICS\n</topic_importance>"));
        assert!(p.contains("Do not generate answers"));
        assert!(p.contains("not a question distribution"));
    }

    #[test]
    fn caption_prompt_names_document() {
        let p = caption_prompt("calculus_notes.pdf");
        assert!(p.contains("calculus_notes.pdf"));
        assert!(!p.contains("{name}"));
    }
}
