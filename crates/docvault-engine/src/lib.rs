//! docvault-engine
//!
//! The archive service: shared store + index state, the Document Processor,
//! the Query Service, snapshots and the assistant-client contract, behind
//! one explicitly constructed [`Archive`].

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tracing::{info, warn};

use docvault_core::config::Settings;
use docvault_core::loader::DirectoryLoader;
use docvault_core::{Document, DocumentSummary, Embedder, Error, Result, SearchResult, SourceDocument};

pub mod client;
pub mod embedding;
pub mod processor;
pub mod query;
pub mod snapshot;
pub mod state;

pub use client::{ArchiveEvent, ArchiveInfo, AssistantClient};
pub use processor::{BatchItem, DocumentDigest, DocumentProcessor, ProcessedDocument, ProcessingFailure, Stage};
pub use query::QueryService;
pub use snapshot::Snapshot;
pub use state::ArchiveState;

pub struct Archive {
    name: String,
    state: Arc<RwLock<ArchiveState>>,
    embedder: Arc<dyn Embedder>,
    processor: DocumentProcessor,
    query: QueryService,
    loader: DirectoryLoader,
    default_top_k: usize,
    clients: RwLock<Vec<Arc<dyn AssistantClient>>>,
}

impl Archive {
    pub fn new(settings: &Settings, embedder: Arc<dyn Embedder>) -> Self {
        let state = Arc::new(RwLock::new(ArchiveState::with_dimension(embedder.dim())));
        let processor = DocumentProcessor::new(state.clone(), embedder.clone(), settings.processing.clone());
        let query = QueryService::new(
            state.clone(),
            embedder.clone(),
            Duration::from_millis(settings.processing.embed_timeout_ms),
            settings.search.max_top_k,
        );
        Self {
            name: settings.data.name.clone(),
            state,
            embedder,
            processor,
            query,
            loader: DirectoryLoader::new(settings.data.extensions.clone()),
            default_top_k: settings.search.default_top_k,
            clients: RwLock::new(Vec::new()),
        }
    }

    /// Build the configured embedding provider and an empty archive around it.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let embedder = docvault_embed::build_embedder(&settings.embedding)?;
        Ok(Self::new(settings, embedder))
    }

    pub fn name(&self) -> &str { &self.name }

    pub fn loader(&self) -> &DirectoryLoader { &self.loader }

    pub fn default_top_k(&self) -> usize { self.default_top_k }

    pub async fn search(&self, query: &str, top_k: usize) -> Result<Vec<SearchResult>> {
        self.query.search(query, top_k).await
    }

    pub async fn get_document(&self, id: &str) -> Result<Document> {
        self.state.read().await.store().get(id).cloned()
    }

    pub async fn list_documents(&self) -> Vec<DocumentSummary> { self.state.read().await.store().list() }

    pub async fn summarize_document(&self, id: &str) -> Result<DocumentDigest> { self.processor.summarize(id).await }

    pub async fn delete_document(&self, id: &str) -> Result<Document> {
        let document = self.state.write().await.remove(id)?;
        info!(document.id = %id, "document deleted");
        self.notify(ArchiveEvent::Removed { id: document.id.clone() }).await;
        Ok(document)
    }

    pub async fn process(&self, source: SourceDocument) -> Result<ProcessedDocument> {
        let processed = self.processor.process(source).await?;
        self.notify(ArchiveEvent::Indexed { id: processed.id.clone() }).await;
        Ok(processed)
    }

    pub async fn process_batch(&self, sources: Vec<SourceDocument>) -> Vec<BatchItem> {
        let items = self.processor.process_batch(sources).await;
        for item in items.iter().filter(|i| i.is_indexed()) {
            self.notify(ArchiveEvent::Indexed { id: item.id().to_string() }).await;
        }
        items
    }

    /// Load every accepted file under `dir` and process them as one batch.
    pub async fn ingest_dir(&self, dir: &Path) -> Result<Vec<BatchItem>> {
        let loader = self.loader.clone();
        let root = dir.to_path_buf();
        let sources = tokio::task::spawn_blocking(move || loader.load_dir(&root))
            .await
            .map_err(|e| Error::Io(std::io::Error::other(e)))??;
        info!(dir = %dir.display(), files = sources.len(), "ingesting directory");
        Ok(self.process_batch(sources).await)
    }

    pub async fn context(&self) -> ArchiveInfo {
        let state = self.state.read().await;
        ArchiveInfo {
            name: self.name.clone(),
            documents: state.store().len(),
            indexed: state.index().len(),
            dimension: state.index().dimension(),
            provider: self.embedder.id().to_string(),
            extensions: self.loader.extensions().to_vec(),
        }
    }

    pub async fn is_consistent(&self) -> bool { self.state.read().await.is_consistent() }

    pub async fn snapshot(&self) -> Snapshot {
        let state = self.state.read().await;
        Snapshot::capture(&state, self.embedder.id(), self.embedder.dim())
    }

    /// Replace the whole state with `snapshot`. The snapshot must come from
    /// the same embedding provider; nothing changes when validation fails.
    pub async fn restore(&self, snapshot: Snapshot) -> Result<usize> {
        if snapshot.provider != self.embedder.id() || snapshot.dimension != self.embedder.dim() {
            return Err(Error::Snapshot(format!(
                "snapshot was built with {} (dim {}), archive uses {} (dim {})",
                snapshot.provider,
                snapshot.dimension,
                self.embedder.id(),
                self.embedder.dim()
            )));
        }
        let restored = snapshot.into_state()?;
        let count = restored.store().len();
        *self.state.write().await = restored;
        info!(documents = count, "archive restored");
        Ok(count)
    }

    pub async fn save_snapshot(&self, path: &Path) -> Result<usize> {
        let snapshot = self.snapshot().await;
        snapshot.save(path)?;
        Ok(snapshot.documents.len())
    }

    pub async fn load_snapshot(&self, path: &Path) -> Result<usize> { self.restore(Snapshot::load(path)?).await }

    /// Register `client` with the current archive context and keep it for
    /// change events. A failed registration is logged and the client is
    /// still attached.
    pub async fn attach_client(&self, client: Arc<dyn AssistantClient>) {
        let info = self.context().await;
        if let Err(e) = client.register(&info) {
            warn!(error = %e, "assistant client registration failed");
        }
        self.clients.write().await.push(client);
    }

    async fn notify(&self, event: ArchiveEvent) {
        for client in self.clients.read().await.iter() {
            if let Err(e) = client.notify(&event) {
                warn!(error = %e, event = ?event, "assistant client notification failed");
            }
        }
    }
}
