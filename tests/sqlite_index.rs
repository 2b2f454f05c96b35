//! SQLite vector index against a real database file.

use paper_rag::db::INDEX_DB_FILE;
use paper_rag::models::{ChunkMetadata, IndexRecord};
use paper_rag::store::{content_hash, SqliteIndex, VectorIndex};
use tempfile::TempDir;

fn record(id: &str, embedding: Vec<f32>, text: &str, page: Option<i64>) -> IndexRecord {
    IndexRecord {
        id: id.to_string(),
        embedding,
        document: text.to_string(),
        metadata: ChunkMetadata {
            paper_id: Some("p".to_string()),
            paper_title: Some("Paper P".to_string()),
            page_idx: page,
            chunk_index: Some(0),
            chunk_type: Some("text".to_string()),
            source_path: Some("papers/p/p_content_list.json".to_string()),
            pdf_path: None,
        },
    }
}

#[tokio::test]
async fn test_open_creates_database_file() {
    let tmp = TempDir::new().unwrap();
    let index_dir = tmp.path().join("data").join("index");

    let index = SqliteIndex::open(&index_dir, "paper_chunks").await.unwrap();
    assert_eq!(index.name(), "paper_chunks");
    assert_eq!(index.count().await.unwrap(), 0);
    index.close().await;

    assert!(index_dir.join(INDEX_DB_FILE).exists());
}

#[tokio::test]
async fn test_query_orders_by_distance_and_keeps_metadata() {
    let tmp = TempDir::new().unwrap();
    let index = SqliteIndex::open(tmp.path(), "c").await.unwrap();

    index
        .upsert(&[
            record("p-000000", vec![0.0, 1.0, 0.0], "orthogonal", Some(0)),
            record("p-000001", vec![1.0, 0.0, 0.0], "exact", Some(3)),
            record("p-000002", vec![1.0, 1.0, 0.0], "diagonal", None),
        ])
        .await
        .unwrap();

    let result = index.query(&[1.0, 0.0, 0.0], 2).await.unwrap();
    let ids: Vec<&str> = result.hits.iter().map(|h| h.id.as_str()).collect();
    assert_eq!(ids, vec!["p-000001", "p-000002"]);

    let best = &result.hits[0];
    assert_eq!(best.document, "exact");
    assert_eq!(best.metadata.page_idx, Some(3));
    assert_eq!(best.metadata.paper_title.as_deref(), Some("Paper P"));
    assert!(best.distance.unwrap().abs() < 1e-6);
    assert!(result.hits[1].distance.unwrap() > best.distance.unwrap());

    index.close().await;
}

#[tokio::test]
async fn test_upsert_replaces_and_tracks_hashes() {
    let tmp = TempDir::new().unwrap();
    let index = SqliteIndex::open(tmp.path(), "c").await.unwrap();

    index
        .upsert(&[record("a", vec![1.0, 0.0], "old text", None)])
        .await
        .unwrap();
    index
        .upsert(&[record("a", vec![0.0, 1.0], "new text", None)])
        .await
        .unwrap();

    assert_eq!(index.count().await.unwrap(), 1);
    let hashes = index.content_hashes().await.unwrap();
    assert_eq!(hashes.get("a"), Some(&content_hash("new text")));

    let result = index.query(&[0.0, 1.0], 1).await.unwrap();
    assert_eq!(result.hits[0].document, "new text");

    index.close().await;
}

#[tokio::test]
async fn test_collections_are_isolated_and_persist() {
    let tmp = TempDir::new().unwrap();

    let first = SqliteIndex::open(tmp.path(), "first").await.unwrap();
    first
        .upsert(&[
            record("x", vec![1.0], "x", None),
            record("y", vec![1.0], "y", None),
        ])
        .await
        .unwrap();
    first.close().await;

    let second = SqliteIndex::open(tmp.path(), "second").await.unwrap();
    assert_eq!(second.count().await.unwrap(), 0);
    assert!(second.query(&[1.0], 5).await.unwrap().is_empty());
    second.close().await;

    let reopened = SqliteIndex::open(tmp.path(), "first").await.unwrap();
    assert_eq!(reopened.count().await.unwrap(), 2);
    reopened.reset().await.unwrap();
    assert_eq!(reopened.count().await.unwrap(), 0);
    assert!(reopened.content_hashes().await.unwrap().is_empty());
    reopened.close().await;
}
