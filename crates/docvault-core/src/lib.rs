//! docvault-core
//!
//! Data model, error kinds, the `Embedder` capability, configuration, the
//! in-memory document store and the directory ingestion collaborator.

pub mod config;
pub mod error;
pub mod loader;
pub mod store;
pub mod text;
pub mod traits;
pub mod types;

pub use error::{Error, ErrorKind, Result};
pub use store::DocumentStore;
pub use traits::Embedder;
pub use types::{Document, DocumentId, DocumentSummary, MetaValue, Metadata, SearchHit, SearchResult, SourceDocument};
