//! Outbound contract toward a remote assistant.
//!
//! The archive registers itself and pushes change events; the assistant's
//! queries come back through [`crate::Archive::search`]. Client failures are
//! logged by the archive and never fail the operation that triggered them.

use serde::{Deserialize, Serialize};

use docvault_core::{DocumentId, Result};

/// Archive description, also served as the transport's context.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ArchiveInfo {
    pub name: String,
    pub documents: usize,
    pub indexed: usize,
    pub dimension: Option<usize>,
    pub provider: String,
    pub extensions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ArchiveEvent {
    Indexed { id: DocumentId },
    Removed { id: DocumentId },
}

pub trait AssistantClient: Send + Sync {
    fn register(&self, info: &ArchiveInfo) -> Result<()>;
    fn notify(&self, event: &ArchiveEvent) -> Result<()>;
}
