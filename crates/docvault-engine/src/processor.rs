//! Document Processor: source document → stored, embedded and indexed.
//!
//! Each document moves `Ingested → Embedded → Indexed`, or ends in `Failed`.
//! Embeddings for a batch are computed concurrently (bounded by
//! `processing.max_parallel_embeds`); writes to the shared state happen under
//! one write lock, in input order.

use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, error, info};

use docvault_core::config::ProcessingSettings;
use docvault_core::{Document, DocumentId, Embedder, Error, ErrorKind, Result, SourceDocument};

use crate::embedding::embed_with_timeout;
use crate::state::ArchiveState;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Ingested,
    Embedded,
    Indexed,
    Failed,
}

/// Outcome of a successfully indexed document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProcessedDocument {
    pub id: DocumentId,
    pub filename: String,
    pub summary: String,
    pub word_count: usize,
    pub char_count: usize,
    pub provider: String,
    pub dimension: usize,
}

/// Why a document did not reach `Indexed`. `stage` is the last stage it completed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProcessingFailure {
    pub id: DocumentId,
    pub kind: ErrorKind,
    pub message: String,
    pub stage: Stage,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BatchItem {
    Indexed(ProcessedDocument),
    Failed(ProcessingFailure),
}

impl BatchItem {
    pub fn id(&self) -> &str {
        match self {
            Self::Indexed(p) => &p.id,
            Self::Failed(f) => &f.id,
        }
    }

    /// Terminal stage of the document.
    pub fn stage(&self) -> Stage {
        match self {
            Self::Indexed(_) => Stage::Indexed,
            Self::Failed(_) => Stage::Failed,
        }
    }

    pub fn is_indexed(&self) -> bool { self.stage() == Stage::Indexed }
}

/// Short description of a stored document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentDigest {
    pub id: DocumentId,
    pub filename: String,
    pub summary: String,
    pub word_count: usize,
}

pub struct DocumentProcessor {
    state: Arc<RwLock<ArchiveState>>,
    embedder: Arc<dyn Embedder>,
    settings: ProcessingSettings,
}

impl DocumentProcessor {
    pub fn new(state: Arc<RwLock<ArchiveState>>, embedder: Arc<dyn Embedder>, settings: ProcessingSettings) -> Self {
        Self { state, embedder, settings }
    }

    fn timeout(&self) -> Duration { Duration::from_millis(self.settings.embed_timeout_ms) }

    async fn embed(&self, document: &Document) -> Result<Vec<f32>> {
        embed_with_timeout(self.embedder.clone(), document.content.clone(), self.timeout()).await
    }

    fn processed(&self, document: &Document) -> ProcessedDocument {
        ProcessedDocument {
            id: document.id.clone(),
            filename: document.filename.clone(),
            summary: document.summary.clone(),
            word_count: document.word_count,
            char_count: document.char_count,
            provider: self.embedder.id().to_string(),
            dimension: self.embedder.dim(),
        }
    }

    /// Ingest, embed and index one document.
    pub async fn process(&self, source: SourceDocument) -> Result<ProcessedDocument> {
        let document = Document::from_source(source, self.settings.summary_max_chars);
        debug!(document.id = %document.id, "ingested");
        let vector = match self.embed(&document).await {
            Ok(v) => v,
            Err(e) => {
                error!(document.id = %document.id, error = %e, "embedding failed");
                return Err(e);
            }
        };
        let processed = self.processed(&document);
        let mut state = self.state.write().await;
        commit(&mut state, document, vector)?;
        Ok(processed)
    }

    /// Process `sources` and report one item per input, in input order.
    /// Later duplicates of an id replace earlier ones.
    pub async fn process_batch(&self, sources: Vec<SourceDocument>) -> Vec<BatchItem> {
        let documents: Vec<Document> = sources
            .into_iter()
            .map(|s| Document::from_source(s, self.settings.summary_max_chars))
            .collect();
        let total = documents.len();

        let embedded: Vec<(Document, Result<Vec<f32>>)> = stream::iter(documents)
            .map(|document| async move {
                let vector = self.embed(&document).await;
                (document, vector)
            })
            .buffered(self.settings.max_parallel_embeds.max(1))
            .collect()
            .await;

        let mut state = self.state.write().await;
        let items: Vec<BatchItem> = embedded
            .into_iter()
            .map(|(document, vector)| match vector {
                Ok(vector) => {
                    let processed = self.processed(&document);
                    match commit(&mut state, document, vector) {
                        Ok(()) => BatchItem::Indexed(processed),
                        Err(e) => BatchItem::Failed(failure(processed.id, e, Stage::Embedded)),
                    }
                }
                Err(e) => {
                    error!(document.id = %document.id, error = %e, "embedding failed");
                    BatchItem::Failed(failure(document.id, e, Stage::Ingested))
                }
            })
            .collect();
        drop(state);

        let indexed = items.iter().filter(|i| i.is_indexed()).count();
        info!(total, indexed, failed = total - indexed, "batch processed");
        items
    }

    pub async fn summarize(&self, id: &str) -> Result<DocumentDigest> {
        let state = self.state.read().await;
        let document = state.store().get(id)?;
        Ok(DocumentDigest {
            id: document.id.clone(),
            filename: document.filename.clone(),
            summary: document.summary.clone(),
            word_count: document.word_count,
        })
    }
}

fn commit(state: &mut ArchiveState, document: Document, vector: Vec<f32>) -> Result<()> {
    let id = document.id.clone();
    match state.commit(document, vector) {
        Ok(replaced) => {
            info!(document.id = %id, replaced = replaced.is_some(), "document indexed");
            Ok(())
        }
        Err(e) => {
            error!(document.id = %id, error = %e, "indexing failed");
            Err(e)
        }
    }
}

fn failure(id: DocumentId, error: Error, stage: Stage) -> ProcessingFailure {
    ProcessingFailure { id, kind: error.kind(), message: error.to_string(), stage }
}
