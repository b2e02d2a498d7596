//! In-memory fakes for engine tests.

use crate::Result;
use crate::database::{ChunkMetadata, IndexRecord, MetadataFilter, SearchResult, VectorIndex};
use crate::embeddings::Embedder;
use crate::{KnowledgeError, engine::ChunkRecord};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Mutex;

/// Brute-force vector index backed by a map keyed on chunk id.
pub struct MemoryIndex {
    entries: Mutex<BTreeMap<String, IndexRecord>>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(BTreeMap::new()),
        }
    }
}

fn metadata_field<'a>(metadata: &'a ChunkMetadata, key: &str) -> Option<&'a str> {
    match key {
        "role" => Some(&metadata.role),
        "role_name" => Some(&metadata.role_name),
        "source_file" => Some(&metadata.source_file),
        _ => None,
    }
}

fn matches_filter(metadata: &ChunkMetadata, filter: &MetadataFilter) -> bool {
    filter
        .iter()
        .all(|(key, value)| metadata_field(metadata, key) == Some(value.as_str()))
}

fn euclidean(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}

#[async_trait]
impl VectorIndex for MemoryIndex {
    async fn upsert(&self, records: Vec<IndexRecord>) -> Result<()> {
        let mut entries = self.entries.lock().unwrap();
        for record in records {
            entries.insert(record.id.clone(), record);
        }
        Ok(())
    }

    async fn query(
        &self,
        vector: &[f32],
        limit: usize,
        filter: &MetadataFilter,
    ) -> Result<Vec<SearchResult>> {
        let entries = self.entries.lock().unwrap();
        let mut results: Vec<SearchResult> = entries
            .values()
            .filter(|record| matches_filter(&record.metadata, filter))
            .map(|record| SearchResult {
                id: record.id.clone(),
                content: record.content.clone(),
                metadata: record.metadata.clone(),
                distance: euclidean(&record.vector, vector),
            })
            .collect();
        results.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        results.truncate(limit);
        Ok(results)
    }

    async fn scan_metadata(&self) -> Result<Vec<ChunkMetadata>> {
        let entries = self.entries.lock().unwrap();
        Ok(entries.values().map(|r| r.metadata.clone()).collect())
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.entries.lock().unwrap().len() as u64)
    }

    async fn drop_all(&self) -> Result<()> {
        self.entries.lock().unwrap().clear();
        Ok(())
    }
}

/// Deterministic embedder: identical text always maps to the identical
/// vector, so a query equal to a stored chunk lands at distance zero.
pub struct StubEmbedder {
    dimension: usize,
}

impl StubEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

impl Embedder for StubEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vector = vec![0.0f32; self.dimension];
        for (i, byte) in text.bytes().enumerate() {
            vector[i % self.dimension] += f32::from(byte) / 255.0;
        }
        Ok(vector)
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed(t)).collect()
    }
}

/// Embedder that always errors, for failure-path tests.
pub struct FailingEmbedder;

impl Embedder for FailingEmbedder {
    fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Err(KnowledgeError::Embedding("stub failure".to_string()))
    }

    fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Err(KnowledgeError::Embedding("stub failure".to_string()))
    }
}

pub fn chunk(id: &str, content: &str, role: &str, role_name: &str, source: &str) -> ChunkRecord {
    ChunkRecord {
        id: id.to_string(),
        content: content.to_string(),
        metadata: ChunkMetadata {
            role: role.to_string(),
            role_name: role_name.to_string(),
            source_file: source.to_string(),
            chunk_index: 0,
            total_chunks: 1,
        },
    }
}
