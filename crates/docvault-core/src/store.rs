//! In-memory document store keyed by document id.
//!
//! Entries keep their first insertion position, so listings are reproducible
//! across runs that ingest the same inputs in the same order.

use chrono::Utc;
use indexmap::IndexMap;

use crate::error::{Error, Result};
use crate::types::{Document, DocumentId, DocumentSummary};

#[derive(Debug, Default, Clone)]
pub struct DocumentStore {
    docs: IndexMap<DocumentId, Document>,
}

impl DocumentStore {
    pub fn new() -> Self { Self::default() }

    /// Insert or replace by id, stamping the ingestion time.
    /// Returns the replaced document, if any.
    pub fn put(&mut self, mut document: Document) -> Option<Document> {
        document.ingested_at = Utc::now();
        self.docs.insert(document.id.clone(), document)
    }

    /// Insert without touching `ingested_at`; used when restoring snapshots.
    pub fn restore(&mut self, document: Document) -> Option<Document> {
        self.docs.insert(document.id.clone(), document)
    }

    pub fn get(&self, id: &str) -> Result<&Document> {
        self.docs.get(id).ok_or_else(|| Error::not_found(id))
    }

    pub fn contains(&self, id: &str) -> bool { self.docs.contains_key(id) }

    pub fn list(&self) -> Vec<DocumentSummary> {
        self.docs.values().map(Document::to_summary).collect()
    }

    /// Explicit delete: unknown ids are an error.
    pub fn delete(&mut self, id: &str) -> Result<Document> {
        self.docs.shift_remove(id).ok_or_else(|| Error::not_found(id))
    }

    /// Cascading cleanup: unknown ids are ignored.
    pub fn discard(&mut self, id: &str) -> Option<Document> { self.docs.shift_remove(id) }

    pub fn iter(&self) -> impl Iterator<Item = &Document> { self.docs.values() }

    pub fn len(&self) -> usize { self.docs.len() }

    pub fn is_empty(&self) -> bool { self.docs.is_empty() }
}
