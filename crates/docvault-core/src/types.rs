//! Domain types shared by the store, the index and the engine.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::text;

pub type DocumentId = String;
pub type Metadata = BTreeMap<String, MetaValue>;

/// A metadata value attached to a document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum MetaValue {
    Text(String),
    Number(f64),
    Date(DateTime<Utc>),
}

impl From<&str> for MetaValue {
    fn from(s: &str) -> Self { Self::Text(s.to_string()) }
}

impl From<String> for MetaValue {
    fn from(s: String) -> Self { Self::Text(s) }
}

impl From<f64> for MetaValue {
    fn from(n: f64) -> Self { Self::Number(n) }
}

impl From<DateTime<Utc>> for MetaValue {
    fn from(d: DateTime<Utc>) -> Self { Self::Date(d) }
}

/// Raw input handed over by an ingestion collaborator.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SourceDocument {
    pub filename: String,
    pub content: String,
    #[serde(default)]
    pub metadata: Metadata,
}

impl SourceDocument {
    pub fn new(filename: impl Into<String>, content: impl Into<String>) -> Self {
        Self { filename: filename.into(), content: content.into(), metadata: Metadata::new() }
    }

    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<MetaValue>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Stable identifier: the filename when present, otherwise a content hash.
    pub fn derive_id(&self) -> DocumentId {
        let name = self.filename.trim();
        if name.is_empty() { text::content_id(&self.content) } else { name.to_string() }
    }
}

/// A stored archive document.
///
/// - `id`: stable identity (filename or content hash)
/// - `summary`: leading sentences of the content, see [`text::summarize`]
/// - `ingested_at`: set by the store on every `put`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    pub id: DocumentId,
    pub filename: String,
    pub content: String,
    pub metadata: Metadata,
    pub word_count: usize,
    pub char_count: usize,
    pub summary: String,
    pub ingested_at: DateTime<Utc>,
}

impl Document {
    pub fn from_source(source: SourceDocument, summary_max_chars: usize) -> Self {
        let id = source.derive_id();
        let summary = text::summarize(&source.content, summary_max_chars);
        Self {
            id,
            word_count: text::word_count(&source.content),
            char_count: source.content.chars().count(),
            summary,
            filename: source.filename,
            content: source.content,
            metadata: source.metadata,
            ingested_at: Utc::now(),
        }
    }

    pub fn to_summary(&self) -> DocumentSummary {
        DocumentSummary {
            id: self.id.clone(),
            filename: self.filename.clone(),
            summary: self.summary.clone(),
            word_count: self.word_count,
            char_count: self.char_count,
            ingested_at: self.ingested_at,
        }
    }
}

/// Listing view of a [`Document`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentSummary {
    pub id: DocumentId,
    pub filename: String,
    pub summary: String,
    pub word_count: usize,
    pub char_count: usize,
    pub ingested_at: DateTime<Utc>,
}

/// Raw index hit. Higher `score` is more similar.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchHit {
    pub id: DocumentId,
    pub score: f32,
}

/// A ranked search result resolved against the document store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResult {
    pub id: DocumentId,
    pub filename: String,
    pub summary: String,
    pub score: f32,
    pub rank: usize,
}
