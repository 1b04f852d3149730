//! docvault-index
//!
//! In-memory similarity index: document id → embedding vector, queried by a
//! flat cosine scan. A scan costs O(n·d) per query, which is fine for
//! archives of a few hundred thousand vectors at small dimensions; ranking
//! uses partial selection so only the top `k` hits are fully sorted.

use std::cmp::Ordering;
use std::collections::HashMap;

use tracing::debug;

use docvault_core::{DocumentId, Error, Result, SearchHit};

const QUERY_ID: &str = "<query>";

#[derive(Debug, Clone)]
struct IndexEntry {
    vector: Vec<f32>,
    norm: f64,
}

/// Vectors keyed by document id. All vectors share one dimensionality, fixed
/// by the first insert (or by [`SimilarityIndex::with_dimension`]).
#[derive(Debug, Default, Clone)]
pub struct SimilarityIndex {
    dim: Option<usize>,
    entries: HashMap<DocumentId, IndexEntry>,
}

impl SimilarityIndex {
    pub fn new() -> Self { Self::default() }

    pub fn with_dimension(dim: usize) -> Self { Self { dim: Some(dim), entries: HashMap::new() } }

    pub fn dimension(&self) -> Option<usize> { self.dim }

    pub fn len(&self) -> usize { self.entries.len() }

    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    pub fn contains(&self, id: &str) -> bool { self.entries.contains_key(id) }

    pub fn get(&self, id: &str) -> Option<&[f32]> { self.entries.get(id).map(|e| e.vector.as_slice()) }

    /// Entries sorted by id.
    pub fn entries(&self) -> Vec<(&DocumentId, &[f32])> {
        let mut out: Vec<_> = self.entries.iter().map(|(id, e)| (id, e.vector.as_slice())).collect();
        out.sort_by(|a, b| a.0.cmp(b.0));
        out
    }

    /// Validate a vector for `id` without inserting it.
    pub fn check(&self, id: &str, vector: &[f32]) -> Result<()> {
        if let Some(expected) = self.dim {
            if vector.len() != expected {
                return Err(Error::DimensionMismatch { id: id.to_string(), expected, actual: vector.len() });
            }
        } else if vector.is_empty() {
            return Err(Error::InvalidArgument(format!("empty vector for '{id}'")));
        }
        if vector.iter().any(|x| !x.is_finite()) {
            return Err(Error::InvalidArgument(format!("vector for '{id}' has non-finite values")));
        }
        Ok(())
    }

    /// Insert or replace. On error nothing changes.
    pub fn upsert(&mut self, id: impl Into<DocumentId>, vector: Vec<f32>) -> Result<()> {
        let id = id.into();
        self.check(&id, &vector)?;
        self.dim.get_or_insert(vector.len());
        let norm = l2_norm(&vector);
        self.entries.insert(id, IndexEntry { vector, norm });
        Ok(())
    }

    /// Idempotent: returns whether an entry was removed.
    pub fn remove(&mut self, id: &str) -> bool { self.entries.remove(id).is_some() }

    /// Top `top_k` entries by cosine similarity to `vector`.
    ///
    /// `top_k` is clamped to the number of entries. Equal scores are ordered
    /// by id ascending. An empty index yields an empty result.
    pub fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<SearchHit>> {
        if top_k == 0 {
            return Err(Error::InvalidArgument("top_k must be at least 1".to_string()));
        }
        if self.entries.is_empty() {
            return Ok(Vec::new());
        }
        self.check(QUERY_ID, vector)?;

        let query_norm = l2_norm(vector);
        let mut hits: Vec<SearchHit> = self
            .entries
            .iter()
            .map(|(id, e)| SearchHit { id: id.clone(), score: cosine_with_norms(&e.vector, e.norm, vector, query_norm) })
            .collect();

        let k = top_k.min(hits.len());
        if k < hits.len() {
            hits.select_nth_unstable_by(k - 1, rank_order);
            hits.truncate(k);
        }
        hits.sort_by(rank_order);
        debug!(entries = self.entries.len(), top_k, hits = hits.len(), "index query");
        Ok(hits)
    }
}

fn rank_order(a: &SearchHit, b: &SearchHit) -> Ordering {
    b.score
        .partial_cmp(&a.score)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.id.cmp(&b.id))
}

// Accumulated in f64: squares of large f32 components overflow f32.
fn l2_norm(v: &[f32]) -> f64 { v.iter().map(|&x| f64::from(x) * f64::from(x)).sum::<f64>().sqrt() }

fn dot(a: &[f32], b: &[f32]) -> f64 { a.iter().zip(b.iter()).map(|(&x, &y)| f64::from(x) * f64::from(y)).sum() }

fn cosine_with_norms(a: &[f32], norm_a: f64, b: &[f32], norm_b: f64) -> f32 {
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot(a, b) / (norm_a * norm_b)).clamp(-1.0, 1.0) as f32
}

/// Cosine similarity in [-1, 1]; 0 when either vector has zero magnitude.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    cosine_with_norms(a, l2_norm(a), b, l2_norm(b))
}
