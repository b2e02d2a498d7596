use super::*;

fn lax(chunk_size: usize, overlap: usize) -> ChunkingConfig {
    ChunkingConfig {
        chunk_size,
        overlap,
        min_chunk_len: 0,
    }
}

fn strip_whitespace(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}

#[test]
fn empty_input_yields_no_chunks() {
    assert!(chunk_document("", &ChunkingConfig::default()).is_empty());
    assert!(chunk_document("   \n\n  ", &ChunkingConfig::default()).is_empty());
}

#[test]
fn short_document_is_dropped() {
    // The only section is 50 chars or fewer after trimming.
    let chunks = chunk_document("## A\nshort text", &ChunkingConfig::default());
    assert!(chunks.is_empty());
}

#[test]
fn single_section_below_chunk_size() {
    let text = format!("## Topic\n{}", "content ".repeat(20));
    let chunks = chunk_document(&text, &ChunkingConfig::default());
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0], text.trim());
}

#[test]
fn sections_pack_greedily_with_blank_line_joins() {
    let body = "x".repeat(60);
    let text = format!("## A\n{body}\n### B\n{body}\n## C\n{body}");
    let chunks = chunk_document(&text, &ChunkingConfig::default());

    // Everything fits in one buffer flush; sections are joined by blank lines.
    assert_eq!(chunks.len(), 1);
    assert_eq!(
        chunks[0],
        format!("## A\n{body}\n\n### B\n{body}\n\n## C\n{body}")
    );
}

#[test]
fn buffer_flushes_before_reaching_chunk_size() {
    let section = format!("## S\n{}", "y".repeat(95));
    let text = [section.as_str(); 5].join("\n");
    let config = lax(250, 20);

    let chunks = chunk_document(&text, &config);
    assert!(chunks.len() > 1);
    for chunk in &chunks {
        assert!(chunk.chars().count() < 250);
    }
    // Buffer-mode splits lose nothing but whitespace.
    assert_eq!(
        strip_whitespace(&chunks.concat()),
        strip_whitespace(&text)
    );
}

#[test]
fn every_chunk_exceeds_minimum_length() {
    let text = format!(
        "## Intro\n{}\n### Detail\n{}\n## Long\n{}",
        "intro words ".repeat(30),
        "detail words ".repeat(40),
        "long section text ".repeat(200),
    );
    let chunks = chunk_document(&text, &ChunkingConfig::default());
    assert!(!chunks.is_empty());
    for chunk in &chunks {
        assert!(chunk.chars().count() > 50);
        assert_eq!(chunk, chunk.trim());
    }
}

#[test]
fn chunking_is_deterministic() {
    let text = format!(
        "## One\n{}\n### Two\n{}\n```rust\nfn main() {{}}\n```\n{}",
        "alpha beta ".repeat(80),
        "gamma delta ".repeat(120),
        "epsilon ".repeat(300),
    );
    let config = ChunkingConfig::default();
    assert_eq!(chunk_document(&text, &config), chunk_document(&text, &config));
}

#[test]
fn oversized_section_force_split_count_and_reconstruction() {
    // No headings and no code fences: one section handled purely by the
    // force splitter. 4000 chars, stride 1300 -> ceil(4000/1300) = 4 slices.
    let text = "abcdefghij".repeat(400);
    let config = ChunkingConfig::default();
    let chunks = chunk_document(&text, &config);

    let stride = config.chunk_size - config.overlap;
    let expected = text.chars().count().div_ceil(stride);
    assert_eq!(chunks.len(), expected);

    // Each slice after the first repeats the previous slice's last
    // `overlap` chars; stripping them reconstructs the section.
    let mut rebuilt = chunks[0].clone();
    for slice in &chunks[1..] {
        rebuilt.extend(slice.chars().skip(config.overlap));
    }
    assert_eq!(rebuilt, text);
}

#[test]
fn oversized_section_splits_at_code_fences_first() {
    let prose = "words and more words ".repeat(25);
    let code = format!("```rust\n{}\n```", "let x = 1;\n".repeat(25));
    let section = format!("## Big\n{prose}\n{code}");
    assert!(section.chars().count() > 600);

    let config = lax(600, 50);
    let chunks = chunk_document(&section, &config);

    // Fence split produced parts below chunk_size, so no force splitting:
    // the code block opens exactly one chunk.
    assert!(chunks.len() >= 2);
    let fenced: Vec<_> = chunks.iter().filter(|c| c.starts_with("```")).collect();
    assert_eq!(fenced.len(), 1);
    assert!(fenced[0].contains("let x = 1;"));
}

#[test]
fn overlap_does_not_apply_to_buffer_flushes() {
    // Two flushes from the greedy buffer must not share content.
    let a = format!("## A\n{}", "a".repeat(140));
    let b = format!("## B\n{}", "b".repeat(140));
    let text = format!("{a}\n{b}");
    let chunks = chunk_document(&text, &lax(150, 50));

    assert_eq!(chunks.len(), 2);
    assert!(!chunks[1].contains('a'));
}
