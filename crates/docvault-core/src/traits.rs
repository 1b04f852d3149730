use crate::error::Result;

/// Converts text into a fixed-dimension vector.
///
/// Implementations must be deterministic: the same text under the same
/// configuration yields a bit-identical vector. Empty text maps to the zero
/// vector rather than an error.
pub trait Embedder: Send + Sync {
    /// Stable identifier for the provider and its configuration (e.g. `hashing:d384:s0`).
    fn id(&self) -> &str;
    fn dim(&self) -> usize;
    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed(t)).collect()
    }
}
