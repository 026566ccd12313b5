//! Tests for retrieval ranking over a persisted index.

use crate::config::get_index_path;
use crate::embeddings::manifest_for;
use crate::embeddings::providers::TrigramProvider;
use crate::index::{init_index, insert_chunk, insert_source, write_manifest};
use crate::types::{KnowledgeChunk, KnowledgeSource};
use crate::vector_index::{FlatIndex, VectorIndex};
use chrono::Utc;
use tempfile::TempDir;

/// Helper to create a test chunk with embedding.
fn create_test_chunk(id: &str, text: &str, embedding: Vec<f32>) -> KnowledgeChunk {
    KnowledgeChunk {
        id: id.to_string(),
        source: "data/Medical_book.pdf".to_string(),
        position: 0,
        text: text.to_string(),
        embedding: Some(embedding),
    }
}

/// Helper to create a normalized embedding.
fn normalize(v: &[f32]) -> Vec<f32> {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        v.iter().map(|x| x / norm).collect()
    } else {
        v.to_vec()
    }
}

/// Persist chunks with a manifest for `dims`-wide embeddings and load them back.
fn persist_and_load(chunks: Vec<KnowledgeChunk>, dims: usize) -> (TempDir, FlatIndex) {
    let temp = TempDir::new().unwrap();
    let provider = TrigramProvider::new(dims);
    let conn = init_index(&get_index_path(temp.path())).unwrap();

    let source = KnowledgeSource {
        id: "source1".to_string(),
        path: "data/Medical_book.pdf".to_string(),
        learned_at: Utc::now(),
        size_bytes: 100,
        chunk_count: chunks.len() as u32,
    };
    insert_source(&conn, &source).unwrap();

    for chunk in &chunks {
        insert_chunk(&conn, chunk).unwrap();
    }
    write_manifest(&conn, &manifest_for(&provider)).unwrap();
    drop(conn);

    let index = FlatIndex::load(temp.path(), &provider).unwrap();
    (temp, index)
}

#[test]
fn test_relevant_query_returns_high_scores() {
    let (_temp, index) = persist_and_load(
        vec![
            create_test_chunk(
                "chunk1",
                "Hypertension is persistently high blood pressure",
                normalize(&[1.0, 0.5, 0.2, 0.1]),
            ),
            create_test_chunk(
                "chunk2",
                "A fracture is a broken bone",
                normalize(&[-0.3, -0.8, 0.4, -0.2]),
            ),
        ],
        4,
    );

    let query_embedding = normalize(&[0.9, 0.4, 0.3, 0.1]);
    let results = index.search(&query_embedding, 5).unwrap();

    assert_eq!(results.len(), 2);
    assert_eq!(
        results[0].0.id, "chunk1",
        "Most relevant chunk should be first"
    );
    assert!(
        results[0].1 > 0.8,
        "Relevant chunk score should be high: {}",
        results[0].1
    );
    assert!(results[0].1 > results[1].1, "Scores should be ordered");
}

#[test]
fn test_unrelated_query_returns_low_scores() {
    let (_temp, index) = persist_and_load(
        vec![create_test_chunk(
            "chunk1",
            "Symptoms of influenza",
            normalize(&[1.0, 0.0, 0.0, 0.0]),
        )],
        4,
    );

    let query_embedding = normalize(&[0.0, 1.0, 0.0, 0.0]);
    let results = index.search(&query_embedding, 5).unwrap();

    assert_eq!(results.len(), 1);
    assert!(
        results[0].1 < 0.5,
        "Unrelated chunk score should be low: {}",
        results[0].1
    );
}

#[test]
fn test_scores_are_ordered_descending() {
    let (_temp, index) = persist_and_load(
        vec![
            create_test_chunk("chunk1", "Text A", normalize(&[1.0, 0.0, 0.0])),
            create_test_chunk("chunk2", "Text B", normalize(&[0.7, 0.7, 0.0])),
            create_test_chunk("chunk3", "Text C", normalize(&[0.0, 1.0, 0.0])),
            create_test_chunk("chunk4", "Text D", normalize(&[-1.0, 0.0, 0.0])),
        ],
        3,
    );

    let query_embedding = normalize(&[1.0, 0.0, 0.0]);
    let results = index.search(&query_embedding, 10).unwrap();

    assert_eq!(results.len(), 4);
    for i in 1..results.len() {
        assert!(
            results[i - 1].1 >= results[i].1,
            "Scores should be ordered: {} >= {}",
            results[i - 1].1,
            results[i].1
        );
    }

    assert_eq!(results[0].0.id, "chunk1");
    assert!(
        results[0].1 > 0.99,
        "Perfect match should have score near 1.0"
    );
    assert_eq!(results[3].0.id, "chunk4");
    assert!(results[3].1 < -0.9, "Opposite vectors should score near -1.0");
}

#[test]
fn test_empty_index_returns_no_results() {
    let (_temp, index) = persist_and_load(Vec::new(), 3);

    let query_embedding = normalize(&[1.0, 0.0, 0.0]);
    let results = index.search(&query_embedding, 5).unwrap();

    assert!(index.is_empty());
    assert_eq!(results.len(), 0, "Empty index should return no results");
}

#[test]
fn test_top_k_limit_respected() {
    let chunks = (0..10)
        .map(|i| {
            create_test_chunk(
                &format!("chunk{}", i),
                &format!("Text {}", i),
                normalize(&[1.0, i as f32 / 10.0, 0.0]),
            )
        })
        .collect();
    let (_temp, index) = persist_and_load(chunks, 3);

    let query_embedding = normalize(&[1.0, 0.0, 0.0]);
    let results = index.search(&query_embedding, 3).unwrap();

    assert_eq!(results.len(), 3, "Should return exactly top_k results");
    assert_eq!(results[0].0.id, "chunk0");
}

#[test]
fn test_chunk_text_survives_persistence() {
    let (_temp, index) = persist_and_load(
        vec![create_test_chunk(
            "chunk1",
            "Insulin lowers blood glucose; doses vary (see §4).",
            normalize(&[0.2, 0.4, 0.6]),
        )],
        3,
    );

    let results = index.search(&normalize(&[0.2, 0.4, 0.6]), 1).unwrap();
    assert_eq!(
        results[0].0.text,
        "Insulin lowers blood glucose; doses vary (see §4)."
    );
    assert_eq!(results[0].0.source, "data/Medical_book.pdf");
}
