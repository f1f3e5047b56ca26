//! Embedding generation: one backend call per passage.
//!
//! Calls are sequential and unbatched, and nothing is cached — a repeated
//! passage costs a repeated call. A backend failure (after the client's own
//! retries) aborts the run; there is no partial-embedding recovery, because a
//! passage without a vector could never receive a cluster label.

use crate::backend::EmbeddingBackend;
use crate::error::StudyGenError;
use std::sync::Arc;
use tracing::debug;

/// Embed every passage, in order.
///
/// The returned matrix is 1:1 positional with `passages`. Dimensionality is
/// fixed by the backend for a run; a mid-run change is reported as an
/// internal error since mixed-width vectors cannot be clustered.
pub async fn embed_passages(
    embedder: &Arc<dyn EmbeddingBackend>,
    passages: &[String],
) -> Result<Vec<Vec<f32>>, StudyGenError> {
    let mut vectors = Vec::with_capacity(passages.len());
    let mut width: Option<usize> = None;

    for (i, passage) in passages.iter().enumerate() {
        let vector = embedder.embed(passage).await?;
        if vector.is_empty() {
            return Err(StudyGenError::backend(
                "embedding",
                format!("passage {i} produced an empty vector"),
            ));
        }
        match width {
            None => width = Some(vector.len()),
            Some(w) if w != vector.len() => {
                return Err(StudyGenError::Internal(format!(
                    "embedding dimensionality changed mid-run: passage {i} has {} dims, expected {w}",
                    vector.len()
                )));
            }
            Some(_) => {}
        }
        debug!("embedded passage {}/{}", i + 1, passages.len());
        vectors.push(vector);
    }

    Ok(vectors)
}
