use super::*;
use tempfile::TempDir;

fn write_file(dir: &TempDir, name: &str, content: &str) {
    std::fs::write(dir.path().join(name), content).expect("should write corpus file");
}

fn section(heading: &str, body_word: &str) -> String {
    format!("## {heading}\n{}\n", body_word.repeat(20))
}

#[test]
fn missing_directory_is_an_error() {
    let result = load_corpus(
        Path::new("/definitely/not/a/real/corpus"),
        &ChunkingConfig::default(),
    );
    assert!(matches!(result, Err(KnowledgeError::NotFound(_))));
}

#[test]
fn role_is_resolved_from_filename_prefix() {
    assert_eq!(
        resolve_role("01_Solution_Architect_Overview"),
        ("solution_architect", "Solution Architect - Dr. Michael Torres")
    );
    assert_eq!(resolve_role("02_Backend_Lead_APIs").0, "backend_lead");
    assert_eq!(resolve_role("22_PostMortems_2024").0, "postmortems");
    assert_eq!(resolve_role("00_README").0, "overview");
}

#[test]
fn unmatched_prefix_falls_back_to_general() {
    assert_eq!(resolve_role("99_Mystery_File"), FALLBACK_ROLE);
    assert_eq!(resolve_role(""), FALLBACK_ROLE);
}

#[test]
fn role_lookup_helpers_agree_with_the_table() {
    assert!(is_known_role("qa_lead"));
    assert!(!is_known_role("general"));
    assert!(!is_known_role("qa"));

    let info = role_info("devops_lead").expect("devops_lead should exist");
    assert_eq!(info.prefix, "05_DevOps_Lead");
}

#[test]
fn loads_chunks_with_metadata() {
    let dir = TempDir::new().expect("should create temp dir");
    write_file(
        &dir,
        "07_QA_Lead_Testing.md",
        &section("Strategy", "testing pyramids matter "),
    );

    let records =
        load_corpus(dir.path(), &ChunkingConfig::default()).expect("load should succeed");

    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.id, "qa_lead_0000");
    assert_eq!(record.metadata.role, "qa_lead");
    assert_eq!(record.metadata.role_name, "QA Lead - Susan Martinez");
    assert_eq!(record.metadata.source_file, "07_QA_Lead_Testing");
    assert_eq!(record.metadata.chunk_index, 0);
    assert_eq!(record.metadata.total_chunks, 1);
}

#[test]
fn ids_count_per_role_across_files() {
    let dir = TempDir::new().expect("should create temp dir");
    // Both unknown prefixes map to the fallback role; ids must not collide.
    write_file(&dir, "notes_a.md", &section("First", "alpha words here "));
    write_file(&dir, "notes_b.md", &section("Second", "beta words there "));

    let records =
        load_corpus(dir.path(), &ChunkingConfig::default()).expect("load should succeed");

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].id, "general_0000");
    assert_eq!(records[1].id, "general_0001");
    // Positional metadata stays per-file.
    assert_eq!(records[1].metadata.chunk_index, 0);
    assert_eq!(records[1].metadata.source_file, "notes_b");
}

#[test]
fn files_are_processed_in_name_order() {
    let dir = TempDir::new().expect("should create temp dir");
    write_file(
        &dir,
        "02_Backend_Lead_Two.md",
        &section("Two", "backend content body "),
    );
    write_file(
        &dir,
        "01_Solution_Architect_One.md",
        &section("One", "architecture content body "),
    );

    let records =
        load_corpus(dir.path(), &ChunkingConfig::default()).expect("load should succeed");

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].metadata.role, "solution_architect");
    assert_eq!(records[1].metadata.role, "backend_lead");
}

#[test]
fn non_markdown_and_tiny_files_are_skipped() {
    let dir = TempDir::new().expect("should create temp dir");
    write_file(&dir, "readme.txt", &section("Ignored", "plain text content "));
    write_file(&dir, "03_Frontend_Lead_Tiny.md", "## Too\nshort");
    write_file(
        &dir,
        "03_Frontend_Lead_Real.md",
        &section("Components", "component state handling "),
    );

    let records =
        load_corpus(dir.path(), &ChunkingConfig::default()).expect("load should succeed");

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].metadata.source_file, "03_Frontend_Lead_Real");
}

#[test]
fn empty_directory_yields_no_records() {
    let dir = TempDir::new().expect("should create temp dir");
    let records =
        load_corpus(dir.path(), &ChunkingConfig::default()).expect("load should succeed");
    assert!(records.is_empty());
}

#[test]
fn multi_section_file_numbers_chunks_in_order() {
    let dir = TempDir::new().expect("should create temp dir");
    // Two sections that cannot share a chunk with size 200.
    let content = format!(
        "{}\n{}",
        format!("## One\n{}", "first section text ".repeat(10)),
        format!("## Two\n{}", "second section text ".repeat(10)),
    );
    write_file(&dir, "05_DevOps_Lead_Pipelines.md", &content);

    let config = ChunkingConfig {
        chunk_size: 200,
        overlap: 20,
        min_chunk_len: 50,
    };
    let records = load_corpus(dir.path(), &config).expect("load should succeed");

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].id, "devops_lead_0000");
    assert_eq!(records[1].id, "devops_lead_0001");
    assert_eq!(records[0].metadata.chunk_index, 0);
    assert_eq!(records[1].metadata.chunk_index, 1);
    assert_eq!(records[0].metadata.total_chunks, 2);
    assert_eq!(records[1].metadata.total_chunks, 2);
    assert!(records[0].content.starts_with("## One"));
    assert!(records[1].content.starts_with("## Two"));
}
