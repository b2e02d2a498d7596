//! Corpus loading: walk a directory of markdown knowledge files, tag each
//! file with a role from its filename prefix, and chunk it into records
//! ready for embedding.

pub mod roles;
#[cfg(test)]
mod tests;

use crate::database::ChunkMetadata;
use crate::embeddings::chunking::{ChunkingConfig, chunk_document};
use crate::engine::ChunkRecord;
use crate::{KnowledgeError, Result};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub use roles::{FALLBACK_ROLE, ROLES, RoleInfo, is_known_role, resolve_role, role_info};

/// Load every `*.md` file directly under `dir` into chunk records.
///
/// Files are processed in filename order so ids are deterministic for a
/// given corpus. Ids carry a per-role counter rather than a per-file one;
/// several files mapping to the same role (the fallback role in particular)
/// cannot collide. Files producing no chunks are skipped.
pub fn load_corpus(dir: &Path, chunking: &ChunkingConfig) -> Result<Vec<ChunkRecord>> {
    if !dir.is_dir() {
        return Err(KnowledgeError::NotFound(dir.to_path_buf()));
    }

    let mut paths: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(std::result::Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "md"))
        .collect();
    paths.sort();
    info!("Found {} markdown files in {}", paths.len(), dir.display());

    let mut records = Vec::new();
    let mut role_counters: HashMap<&'static str, u32> = HashMap::new();

    for path in &paths {
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            warn!("Skipping file with non-UTF8 name: {}", path.display());
            continue;
        };

        let content = fs::read_to_string(path)?;
        let (role_id, role_name) = resolve_role(stem);
        let chunks = chunk_document(&content, chunking);
        if chunks.is_empty() {
            debug!("No chunks produced from {}", path.display());
            continue;
        }

        let total_chunks = u32::try_from(chunks.len()).unwrap_or(u32::MAX);
        debug!(
            "Loaded {} chunks from {} as role {}",
            chunks.len(),
            path.display(),
            role_id
        );

        let counter = role_counters.entry(role_id).or_insert(0);
        for (chunk_index, chunk) in chunks.into_iter().enumerate() {
            records.push(ChunkRecord {
                id: format!("{role_id}_{:04}", *counter),
                content: chunk,
                metadata: ChunkMetadata {
                    role: role_id.to_string(),
                    role_name: role_name.to_string(),
                    source_file: stem.to_string(),
                    chunk_index: u32::try_from(chunk_index).unwrap_or(u32::MAX),
                    total_chunks,
                },
            });
            *counter += 1;
        }
    }

    info!(
        "Corpus loaded: {} chunks across {} roles",
        records.len(),
        role_counters.len()
    );
    Ok(records)
}
