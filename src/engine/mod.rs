//! Embedding-backed retrieval engine.
//!
//! Owns the embedding function and the vector index, both behind traits so
//! tests can swap in in-memory fakes and so the index backend can be
//! replaced without touching retrieval semantics.

pub mod gate;
#[cfg(test)]
pub(crate) mod testing;

use crate::Result;
use crate::database::{IndexRecord, MetadataFilter, VectorIndex};
use crate::embeddings::Embedder;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info};

pub use crate::database::{ChunkMetadata, SearchResult};
pub use gate::{EngineGate, GateState};

/// A chunk produced by the document loader, not yet embedded.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkRecord {
    /// Deterministic id: role id plus a zero-padded per-role counter
    pub id: String,
    pub content: String,
    pub metadata: ChunkMetadata,
}

pub struct RetrievalEngine {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
}

impl std::fmt::Debug for RetrievalEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetrievalEngine").finish_non_exhaustive()
    }
}

impl RetrievalEngine {
    #[inline]
    pub fn new(embedder: Arc<dyn Embedder>, index: Arc<dyn VectorIndex>) -> Self {
        Self { embedder, index }
    }

    /// Embed and store a batch of chunk records, returning how many were
    /// written. Ids colliding with stored entries overwrite them. The batch
    /// goes to the index in a single upsert call, so a failure commits
    /// nothing.
    #[inline]
    pub async fn add(&self, records: Vec<ChunkRecord>) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        let texts: Vec<String> = records.iter().map(|r| r.content.clone()).collect();
        let vectors = self.embedder.embed_batch(&texts)?;
        debug!("Embedded {} chunks", vectors.len());

        let index_records: Vec<IndexRecord> = records
            .into_iter()
            .zip(vectors)
            .map(|(record, vector)| IndexRecord {
                id: record.id,
                vector,
                content: record.content,
                metadata: record.metadata,
            })
            .collect();

        let count = index_records.len();
        self.index.upsert(index_records).await?;
        info!("Added {} chunks to the index", count);
        Ok(count)
    }

    /// Nearest-neighbor search, optionally restricted to entries whose
    /// metadata matches every pair in `filter`. Results come back in
    /// ascending distance order; an empty index or an unmatched filter
    /// yields an empty list, not an error.
    #[inline]
    pub async fn search(
        &self,
        query: &str,
        n_results: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<SearchResult>> {
        let vector = self.embedder.embed(query)?;
        let results = self
            .index
            .query(&vector, n_results, filter.unwrap_or(&[]))
            .await?;
        debug!("Search for {:?} returned {} results", query, results.len());
        Ok(results)
    }

    /// Search restricted to a single role's knowledge.
    #[inline]
    pub async fn search_by_role(
        &self,
        query: &str,
        role: &str,
        n_results: usize,
    ) -> Result<Vec<SearchResult>> {
        let filter = [("role".to_string(), role.to_string())];
        self.search(query, n_results, Some(&filter)).await
    }

    /// Distinct role ids present in the store, sorted ascending.
    #[inline]
    pub async fn all_roles(&self) -> Result<Vec<String>> {
        let metadata = self.index.scan_metadata().await?;
        let roles: BTreeSet<String> = metadata.into_iter().map(|m| m.role).collect();
        Ok(roles.into_iter().collect())
    }

    /// Total number of stored chunks.
    #[inline]
    pub async fn count(&self) -> Result<u64> {
        self.index.count().await
    }

    /// Destroy all stored chunks and leave the index empty but usable.
    #[inline]
    pub async fn clear(&self) -> Result<()> {
        self.index.drop_all().await?;
        info!("Cleared the knowledge index");
        Ok(())
    }
}
