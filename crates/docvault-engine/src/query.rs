use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;
use tracing::{debug, info};

use docvault_core::{Embedder, Error, Result, SearchResult};

use crate::embedding::embed_with_timeout;
use crate::state::ArchiveState;

/// Query Service: text → embedding → top-k hits → stored documents.
pub struct QueryService {
    state: Arc<RwLock<ArchiveState>>,
    embedder: Arc<dyn Embedder>,
    timeout: Duration,
    max_top_k: usize,
}

impl QueryService {
    pub fn new(state: Arc<RwLock<ArchiveState>>, embedder: Arc<dyn Embedder>, timeout: Duration, max_top_k: usize) -> Self {
        Self { state, embedder, timeout, max_top_k }
    }

    /// Ranked results for `query`, best first. `top_k` above the configured
    /// maximum is clamped to it.
    pub async fn search(&self, query: &str, top_k: usize) -> Result<Vec<SearchResult>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(Error::EmptyQuery);
        }
        if top_k == 0 {
            return Err(Error::InvalidArgument("top_k must be at least 1".to_string()));
        }
        let top_k = top_k.min(self.max_top_k);
        let started = Instant::now();

        let vector = embed_with_timeout(self.embedder.clone(), query.to_string(), self.timeout).await?;

        // Scan and lookups under one read guard: no half-applied writes are visible.
        let state = self.state.read().await;
        let hits = state.index().query(&vector, top_k)?;
        let results: Vec<SearchResult> = hits
            .into_iter()
            .filter_map(|hit| match state.store().get(&hit.id) {
                Ok(doc) => Some((doc, hit.score)),
                Err(_) => {
                    debug!(document.id = %hit.id, "index hit without stored document");
                    None
                }
            })
            .enumerate()
            .map(|(rank, (doc, score))| SearchResult {
                id: doc.id.clone(),
                filename: doc.filename.clone(),
                summary: doc.summary.clone(),
                score,
                rank,
            })
            .collect();
        drop(state);

        info!(top_k, hits = results.len(), elapsed_ms = started.elapsed().as_millis() as u64, "search");
        Ok(results)
    }
}
