//! JSON snapshots of the archive state.
//!
//! A snapshot is validated in full before it replaces anything: every vector
//! must belong to a document, every document must have a vector and all
//! vectors must have the recorded dimension.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use docvault_core::{Document, DocumentId, DocumentStore, Error, Result};
use docvault_index::SimilarityIndex;

use crate::state::ArchiveState;

pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VectorRecord {
    pub id: DocumentId,
    pub vector: Vec<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Snapshot {
    pub version: u32,
    /// Embedding provider id the vectors were produced with.
    pub provider: String,
    pub dimension: usize,
    /// In store order.
    pub documents: Vec<Document>,
    pub vectors: Vec<VectorRecord>,
}

impl Snapshot {
    pub fn capture(state: &ArchiveState, provider: &str, dimension: usize) -> Self {
        let documents = state.store().iter().cloned().collect();
        let vectors = state
            .index()
            .entries()
            .into_iter()
            .map(|(id, v)| VectorRecord { id: id.clone(), vector: v.to_vec() })
            .collect();
        Self { version: SNAPSHOT_VERSION, provider: provider.to_string(), dimension, documents, vectors }
    }

    /// Build a fresh state from this snapshot. Timestamps are kept as recorded.
    pub fn into_state(self) -> Result<ArchiveState> {
        if self.version != SNAPSHOT_VERSION {
            return Err(Error::Snapshot(format!("unsupported snapshot version {}", self.version)));
        }

        let mut store = DocumentStore::new();
        for document in self.documents {
            let id = document.id.clone();
            if store.restore(document).is_some() {
                return Err(Error::Snapshot(format!("duplicate document '{id}'")));
            }
        }

        let mut index = SimilarityIndex::with_dimension(self.dimension);
        let mut seen = HashSet::new();
        for record in self.vectors {
            if !store.contains(&record.id) {
                return Err(Error::Snapshot(format!("vector for unknown document '{}'", record.id)));
            }
            if !seen.insert(record.id.clone()) {
                return Err(Error::Snapshot(format!("duplicate vector '{}'", record.id)));
            }
            index
                .upsert(record.id, record.vector)
                .map_err(|e| Error::Snapshot(e.to_string()))?;
        }
        if let Some(missing) = store.iter().find(|d| !index.contains(&d.id)) {
            return Err(Error::Snapshot(format!("document '{}' has no vector", missing.id)));
        }
        Ok(ArchiveState::from_parts(store, index))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let bytes = serde_json::to_vec_pretty(self).map_err(|e| Error::Snapshot(e.to_string()))?;
        fs::write(path, bytes)?;
        info!(path = %path.display(), documents = self.documents.len(), "snapshot saved");
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let bytes = fs::read(path)?;
        let snapshot: Self = serde_json::from_slice(&bytes)
            .map_err(|e| Error::Snapshot(format!("{}: {}", path.display(), e)))?;
        info!(path = %path.display(), documents = snapshot.documents.len(), "snapshot loaded");
        Ok(snapshot)
    }
}
