use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use docvault_core::{Embedder, Error, Result};

/// Run `embedder.embed(text)` on the blocking pool, bounded by `timeout`.
///
/// A provider that returns a vector of the wrong length is reported as an
/// embedding error. On timeout the blocking call keeps running detached; its
/// result is dropped.
pub async fn embed_with_timeout(embedder: Arc<dyn Embedder>, text: String, timeout: Duration) -> Result<Vec<f32>> {
    let provider = embedder.id().to_string();
    let dim = embedder.dim();
    let task = tokio::task::spawn_blocking(move || embedder.embed(&text));

    let vector = match tokio::time::timeout(timeout, task).await {
        Err(_) => {
            warn!(provider = %provider, timeout_ms = timeout.as_millis() as u64, "embedding timed out");
            return Err(Error::EmbeddingTimeout { provider, timeout_ms: timeout.as_millis() as u64 });
        }
        Ok(Err(join)) => return Err(Error::embedding(provider, format!("embedding task failed: {join}"))),
        Ok(Ok(result)) => result?,
    };
    if vector.len() != dim {
        return Err(Error::embedding(provider, format!("returned {} values, expected {}", vector.len(), dim)));
    }
    Ok(vector)
}
