//! Store and index held together so every mutation touches both.

use std::collections::BTreeSet;

use docvault_core::{Document, DocumentStore, Result};
use docvault_index::SimilarityIndex;

#[derive(Debug, Default, Clone)]
pub struct ArchiveState {
    store: DocumentStore,
    index: SimilarityIndex,
}

impl ArchiveState {
    pub fn new() -> Self { Self::default() }

    pub fn with_dimension(dim: usize) -> Self {
        Self { store: DocumentStore::new(), index: SimilarityIndex::with_dimension(dim) }
    }

    pub(crate) fn from_parts(store: DocumentStore, index: SimilarityIndex) -> Self { Self { store, index } }

    pub fn store(&self) -> &DocumentStore { &self.store }

    pub fn index(&self) -> &SimilarityIndex { &self.index }

    /// Store `document` and index `vector` under its id.
    ///
    /// The vector is written first; if the index rejects it neither side
    /// changes. Returns the document that was replaced, if any.
    pub fn commit(&mut self, document: Document, vector: Vec<f32>) -> Result<Option<Document>> {
        self.index.upsert(document.id.clone(), vector)?;
        Ok(self.store.put(document))
    }

    /// Delete from the store (strict), then drop the index entry.
    pub fn remove(&mut self, id: &str) -> Result<Document> {
        let document = self.store.delete(id)?;
        self.index.remove(id);
        Ok(document)
    }

    /// Store ids and index ids are the same set.
    pub fn is_consistent(&self) -> bool {
        let stored: BTreeSet<&str> = self.store.iter().map(|d| d.id.as_str()).collect();
        let indexed: BTreeSet<&str> = self.index.entries().into_iter().map(|(id, _)| id.as_str()).collect();
        stored == indexed
    }
}
