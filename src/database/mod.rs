//! Vector index abstraction.
//!
//! The retrieval engine talks to the persistent index only through the
//! [`VectorIndex`] trait, so any backend offering upsert-by-id,
//! nearest-neighbor query with metadata filtering, metadata scan, count and
//! drop can satisfy it. The in-tree backend is LanceDB.

pub mod lancedb;

use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Metadata stored alongside every chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// Role identifier, e.g. `backend_lead`
    pub role: String,
    /// Human-readable role name
    pub role_name: String,
    /// Stem of the file the chunk came from
    pub source_file: String,
    /// Position of this chunk within its source file
    pub chunk_index: u32,
    /// Number of chunks produced from the source file
    pub total_chunks: u32,
}

/// An embedded chunk ready to be written to the index.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexRecord {
    pub id: String,
    pub vector: Vec<f32>,
    pub content: String,
    pub metadata: ChunkMetadata,
}

/// One hit from a nearest-neighbor query. Lower distance is more similar;
/// the engine performs no score normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub id: String,
    pub content: String,
    pub metadata: ChunkMetadata,
    pub distance: f32,
}

/// Conjunctive metadata equality filter: every `(key, value)` pair must
/// match exactly for an entry to qualify.
pub type MetadataFilter = [(String, String)];

/// Persistent collection of `(id, vector, content, metadata)` entries.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Insert records, overwriting any existing entries with the same id.
    /// The whole batch commits atomically or not at all.
    async fn upsert(&self, records: Vec<IndexRecord>) -> Result<()>;

    /// Nearest-neighbor query returning up to `limit` hits matching the
    /// filter, ordered by ascending distance.
    async fn query(
        &self,
        vector: &[f32],
        limit: usize,
        filter: &MetadataFilter,
    ) -> Result<Vec<SearchResult>>;

    /// Metadata of every stored entry.
    async fn scan_metadata(&self) -> Result<Vec<ChunkMetadata>>;

    /// Total number of stored entries.
    async fn count(&self) -> Result<u64>;

    /// Destroy the collection and recreate it empty.
    async fn drop_all(&self) -> Result<()>;
}
