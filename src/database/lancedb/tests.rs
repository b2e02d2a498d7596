use super::*;
use tempfile::TempDir;

const DIM: usize = 5;

async fn create_test_index() -> (LanceIndex, TempDir) {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let index = LanceIndex::connect(&temp_dir.path().join("index"), DIM)
        .await
        .expect("should connect to index");
    (index, temp_dir)
}

fn test_record(id: &str, role: &str, seed: f32) -> IndexRecord {
    let vector = (0..DIM).map(|i| seed + i as f32 * 0.01).collect();
    IndexRecord {
        id: id.to_string(),
        vector,
        content: format!("Stored content for {id}, long enough to be a real chunk."),
        metadata: ChunkMetadata {
            role: role.to_string(),
            role_name: format!("{role} display name"),
            source_file: format!("01_{role}"),
            chunk_index: 0,
            total_chunks: 1,
        },
    }
}

#[tokio::test]
async fn connect_creates_empty_index() {
    let (index, _temp_dir) = create_test_index().await;
    assert_eq!(index.count().await.expect("count should succeed"), 0);
}

#[tokio::test]
async fn upsert_and_count() {
    let (index, _temp_dir) = create_test_index().await;

    index
        .upsert(vec![
            test_record("backend_lead_0000", "backend_lead", 0.1),
            test_record("backend_lead_0001", "backend_lead", 0.2),
            test_record("qa_lead_0000", "qa_lead", 0.9),
        ])
        .await
        .expect("upsert should succeed");

    assert_eq!(index.count().await.expect("count should succeed"), 3);
}

#[tokio::test]
async fn upsert_overwrites_existing_ids() {
    let (index, _temp_dir) = create_test_index().await;

    index
        .upsert(vec![test_record("backend_lead_0000", "backend_lead", 0.1)])
        .await
        .expect("first upsert should succeed");

    let mut replacement = test_record("backend_lead_0000", "backend_lead", 0.5);
    replacement.content = "Replacement content that should overwrite the first record.".to_string();
    index
        .upsert(vec![replacement])
        .await
        .expect("second upsert should succeed");

    assert_eq!(index.count().await.expect("count should succeed"), 1);

    let hits = index
        .query(&[0.5, 0.51, 0.52, 0.53, 0.54], 5, &[])
        .await
        .expect("query should succeed");
    assert_eq!(hits.len(), 1);
    assert!(hits[0].content.starts_with("Replacement content"));
}

#[tokio::test]
async fn query_orders_by_distance_and_respects_filter() {
    let (index, _temp_dir) = create_test_index().await;

    index
        .upsert(vec![
            test_record("backend_lead_0000", "backend_lead", 0.1),
            test_record("qa_lead_0000", "qa_lead", 0.9),
        ])
        .await
        .expect("upsert should succeed");

    // Unfiltered: closest first.
    let hits = index
        .query(&[0.1, 0.11, 0.12, 0.13, 0.14], 10, &[])
        .await
        .expect("query should succeed");
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].metadata.role, "backend_lead");
    assert!(hits[0].distance <= hits[1].distance);

    // Filtered to the farther role: the closer entry must not leak in.
    let filter = vec![("role".to_string(), "qa_lead".to_string())];
    let hits = index
        .query(&[0.1, 0.11, 0.12, 0.13, 0.14], 10, &filter)
        .await
        .expect("filtered query should succeed");
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].metadata.role, "qa_lead");
}

#[tokio::test]
async fn query_rejects_unknown_filter_key() {
    let (index, _temp_dir) = create_test_index().await;
    let filter = vec![("role; DROP TABLE".to_string(), "x".to_string())];
    let result = index.query(&[0.0; DIM], 5, &filter).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn scan_metadata_returns_all_rows() {
    let (index, _temp_dir) = create_test_index().await;

    index
        .upsert(vec![
            test_record("backend_lead_0000", "backend_lead", 0.1),
            test_record("qa_lead_0000", "qa_lead", 0.9),
        ])
        .await
        .expect("upsert should succeed");

    let metadata = index.scan_metadata().await.expect("scan should succeed");
    assert_eq!(metadata.len(), 2);

    let mut roles: Vec<_> = metadata.iter().map(|m| m.role.as_str()).collect();
    roles.sort_unstable();
    assert_eq!(roles, vec!["backend_lead", "qa_lead"]);
}

#[tokio::test]
async fn drop_all_empties_and_recreates() {
    let (index, _temp_dir) = create_test_index().await;

    index
        .upsert(vec![test_record("backend_lead_0000", "backend_lead", 0.1)])
        .await
        .expect("upsert should succeed");
    assert_eq!(index.count().await.expect("count should succeed"), 1);

    index.drop_all().await.expect("drop_all should succeed");
    assert_eq!(index.count().await.expect("count should succeed"), 0);

    // The index stays usable after a clear.
    index
        .upsert(vec![test_record("qa_lead_0000", "qa_lead", 0.9)])
        .await
        .expect("upsert after clear should succeed");
    assert_eq!(index.count().await.expect("count should succeed"), 1);
}

#[tokio::test]
async fn empty_upsert_is_a_noop() {
    let (index, _temp_dir) = create_test_index().await;
    index.upsert(vec![]).await.expect("empty upsert should succeed");
    assert_eq!(index.count().await.expect("count should succeed"), 0);
}
