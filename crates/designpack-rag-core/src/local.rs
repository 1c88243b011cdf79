//! Local in-memory ranking over knowledge-base documents.
//!
//! Every call re-vectorizes the query and all documents; nothing is
//! cached between calls.

use crate::models::{LocalDocument, LocalHit};
use crate::vector::SparseVector;

/// Rank `docs` against `query` by sparse cosine similarity.
///
/// Results are sorted by score descending and truncated to `k`. The sort
/// is stable, so documents with equal scores keep their input order.
pub fn rank(query: &str, docs: &[LocalDocument], k: usize) -> Vec<LocalHit> {
    let qv = SparseVector::from_text(query);
    let mut hits: Vec<LocalHit> = docs
        .iter()
        .map(|doc| LocalHit {
            path: doc.path.clone(),
            text: doc.text.clone(),
            score: qv.cosine(&SparseVector::from_text(&doc.text)),
        })
        .collect();
    hits.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    hits.truncate(k);
    hits
}
