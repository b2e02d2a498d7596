#[cfg(test)]
mod tests;

use fancy_regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use tracing::debug;

/// A newline immediately before a level-2 or level-3 markdown heading.
/// The heading line stays attached to the section that follows it.
static SECTION_BOUNDARY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n(?=#{2,3}\s)").expect("valid section boundary regex"));

/// A newline immediately before a fenced code block marker.
static FENCE_BOUNDARY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n(?=```)").expect("valid fence boundary regex"));

/// Configuration for document chunking. All sizes are character counts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Target chunk size; the greedy buffer flushes before reaching it
    pub chunk_size: usize,
    /// Overlap carried between force-split slices of an oversized section
    pub overlap: usize,
    /// Chunks at or below this length after trimming are dropped
    pub min_chunk_len: usize,
}

impl Default for ChunkingConfig {
    #[inline]
    fn default() -> Self {
        Self {
            chunk_size: 1500,
            overlap: 200,
            min_chunk_len: 50,
        }
    }
}

/// Split a markdown document into retrieval-sized passages.
///
/// Sections are cut at `##`/`###` headings and greedily packed into chunks
/// of less than `chunk_size` characters, joined by blank lines. A section
/// that alone exceeds `chunk_size` is first split at code fences; parts that
/// are still oversized are force-split into `chunk_size`-character slices
/// advancing by `chunk_size - overlap`, so consecutive slices share
/// `overlap` characters. Buffer-flushed chunks carry no overlap between
/// them; only force-split slices do.
#[inline]
pub fn chunk_document(content: &str, config: &ChunkingConfig) -> Vec<String> {
    let mut chunks: Vec<String> = Vec::new();
    let mut current = String::new();

    for section in split_before(content, &SECTION_BOUNDARY) {
        let section = section.trim();
        if section.is_empty() {
            continue;
        }

        if char_len(&current) + char_len(section) < config.chunk_size {
            if current.is_empty() {
                current.push_str(section);
            } else {
                current.push_str("\n\n");
                current.push_str(section);
            }
            continue;
        }

        if !current.is_empty() {
            chunks.push(current.trim().to_string());
        }

        if char_len(section) > config.chunk_size {
            for part in split_before(section, &FENCE_BOUNDARY) {
                if char_len(part) > config.chunk_size {
                    force_split(part, config.chunk_size, config.overlap, &mut chunks);
                } else {
                    chunks.push(part.trim().to_string());
                }
            }
            current.clear();
        } else {
            current = section.to_string();
        }
    }

    if !current.is_empty() {
        chunks.push(current.trim().to_string());
    }

    chunks.retain(|c| char_len(c) > config.min_chunk_len);

    debug!("Chunked {} chars into {} chunks", content.len(), chunks.len());
    chunks
}

/// Split `text` at every boundary match, dropping the matched newline.
/// The lookahead keeps the heading or fence with the following piece.
fn split_before<'a>(text: &'a str, boundary: &Regex) -> Vec<&'a str> {
    let mut pieces = Vec::new();
    let mut last = 0;
    for found in boundary.find_iter(text) {
        let Ok(m) = found else { break };
        pieces.push(&text[last..m.start()]);
        last = m.end();
    }
    pieces.push(&text[last..]);
    pieces
}

/// Slice an oversized part into `chunk_size`-character windows advancing by
/// `chunk_size - overlap`. The last slice may be shorter.
fn force_split(part: &str, chunk_size: usize, overlap: usize, out: &mut Vec<String>) {
    let stride = chunk_size.saturating_sub(overlap).max(1);
    let offsets: Vec<usize> = part.char_indices().map(|(i, _)| i).collect();
    let total = offsets.len();

    let mut start = 0;
    while start < total {
        let end = (start + chunk_size).min(total);
        let byte_start = offsets[start];
        let byte_end = if end == total { part.len() } else { offsets[end] };
        out.push(part[byte_start..byte_end].trim().to_string());
        start += stride;
    }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}
