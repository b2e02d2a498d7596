//! Text embedding: the chunking algorithm and the embedding function.
//!
//! The embedding model is an external capability behind the [`Embedder`]
//! trait; the in-tree implementation talks to Ollama over HTTP.

pub mod chunking;
pub mod ollama;

pub use chunking::{ChunkingConfig, chunk_document};
pub use ollama::OllamaClient;

use crate::Result;

/// Opaque embedding function: text in, fixed-width vector out. Calls are
/// blocking; errors propagate unmodified to the caller.
pub trait Embedder: Send + Sync {
    /// Embed a single text.
    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed a batch of texts, returning one vector per input in order.
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}
