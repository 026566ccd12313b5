//! SQLite-backed storage for the vector index.
//!
//! Ingestion writes sources, chunks and the embedding manifest here. The
//! serving path opens the database read-only and loads every chunk into a
//! [`crate::vector_index::FlatIndex`].

use crate::types::{IndexManifest, KnowledgeChunk, KnowledgeSource};
use mediguide_core::{AppError, AppResult};
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use std::path::Path;

/// Initialize the SQLite index database, creating it when needed.
pub fn init_index(db_path: &Path) -> AppResult<Connection> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| AppError::Knowledge(format!("Failed to create index directory: {}", e)))?;
    }

    let conn = Connection::open(db_path)
        .map_err(|e| AppError::Knowledge(format!("Failed to open SQLite index: {}", e)))?;

    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS sources (
            id TEXT PRIMARY KEY,
            path TEXT NOT NULL,
            learned_at TEXT NOT NULL,
            size_bytes INTEGER NOT NULL,
            chunk_count INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS chunks (
            id TEXT PRIMARY KEY,
            source TEXT NOT NULL,
            position INTEGER NOT NULL,
            text TEXT NOT NULL,
            embedding BLOB NOT NULL
        );

        CREATE TABLE IF NOT EXISTS manifest (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            provider TEXT NOT NULL,
            model TEXT NOT NULL,
            dimensions INTEGER NOT NULL,
            built_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_chunks_source ON chunks(source);
        "#,
    )
    .map_err(|e| AppError::Knowledge(format!("Failed to create tables: {}", e)))?;

    tracing::debug!("Initialized SQLite index at {:?}", db_path);
    Ok(conn)
}

/// Open an existing index without write access.
pub fn open_index(db_path: &Path) -> AppResult<Connection> {
    if !db_path.is_file() {
        return Err(AppError::Knowledge(format!(
            "Index not found at {:?}. Run 'mediguide ingest' first.",
            db_path
        )));
    }

    Connection::open_with_flags(
        db_path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .map_err(|e| AppError::Knowledge(format!("Failed to open SQLite index: {}", e)))
}

/// Insert a source into the index.
pub fn insert_source(conn: &Connection, source: &KnowledgeSource) -> AppResult<()> {
    conn.execute(
        "INSERT OR REPLACE INTO sources (id, path, learned_at, size_bytes, chunk_count)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            source.id,
            source.path,
            source.learned_at.to_rfc3339(),
            source.size_bytes as i64,
            source.chunk_count as i64,
        ],
    )
    .map_err(|e| AppError::Knowledge(format!("Failed to insert source: {}", e)))?;

    Ok(())
}

/// Insert a chunk with embedding into the index.
pub fn insert_chunk(conn: &Connection, chunk: &KnowledgeChunk) -> AppResult<()> {
    let embedding_bytes = embedding_to_bytes(
        chunk
            .embedding
            .as_ref()
            .ok_or_else(|| AppError::Knowledge("Chunk missing embedding".to_string()))?,
    );

    conn.execute(
        "INSERT OR REPLACE INTO chunks (id, source, position, text, embedding)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            chunk.id,
            chunk.source,
            chunk.position as i64,
            chunk.text,
            embedding_bytes,
        ],
    )
    .map_err(|e| AppError::Knowledge(format!("Failed to insert chunk: {}", e)))?;

    Ok(())
}

/// Load every chunk with its embedding, in insertion order.
pub fn load_chunks(conn: &Connection) -> AppResult<Vec<KnowledgeChunk>> {
    let mut stmt = conn
        .prepare("SELECT id, source, position, text, embedding FROM chunks ORDER BY rowid")
        .map_err(|e| AppError::Knowledge(format!("Failed to prepare query: {}", e)))?;

    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, Vec<u8>>(4)?,
            ))
        })
        .map_err(|e| AppError::Knowledge(format!("Failed to query chunks: {}", e)))?;

    let mut chunks = Vec::new();
    for row in rows {
        let (id, source, position, text, embedding_bytes) =
            row.map_err(|e| AppError::Knowledge(format!("Failed to read chunk row: {}", e)))?;

        chunks.push(KnowledgeChunk {
            embedding: Some(bytes_to_embedding(&embedding_bytes)?),
            id,
            source,
            position: position as u32,
            text,
        });
    }

    tracing::debug!("Loaded {} chunks from index", chunks.len());
    Ok(chunks)
}

/// Store the embedding manifest, replacing any previous one.
pub fn write_manifest(conn: &Connection, manifest: &IndexManifest) -> AppResult<()> {
    conn.execute(
        "INSERT OR REPLACE INTO manifest (id, provider, model, dimensions, built_at)
         VALUES (1, ?1, ?2, ?3, ?4)",
        params![
            manifest.provider,
            manifest.model,
            manifest.dimensions as i64,
            manifest.built_at.to_rfc3339(),
        ],
    )
    .map_err(|e| AppError::Knowledge(format!("Failed to write manifest: {}", e)))?;

    Ok(())
}

/// Read the embedding manifest, if the index has one.
pub fn read_manifest(conn: &Connection) -> AppResult<Option<IndexManifest>> {
    let row = conn
        .query_row(
            "SELECT provider, model, dimensions, built_at FROM manifest WHERE id = 1",
            [],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, String>(3)?,
                ))
            },
        )
        .optional()
        .map_err(|e| AppError::Knowledge(format!("Failed to read manifest: {}", e)))?;

    row.map(|(provider, model, dimensions, built_at)| {
        let built_at = chrono::DateTime::parse_from_rfc3339(&built_at)
            .map_err(|e| AppError::Knowledge(format!("Invalid manifest timestamp: {}", e)))?
            .with_timezone(&chrono::Utc);

        Ok(IndexManifest {
            provider,
            model,
            dimensions: dimensions as usize,
            built_at,
        })
    })
    .transpose()
}

/// Get statistics for the index.
///
/// Returns (sources_count, chunks_count).
pub fn get_stats(conn: &Connection) -> AppResult<(u32, u32)> {
    let sources_count: u32 = conn
        .query_row("SELECT COUNT(*) FROM sources", [], |row| {
            row.get::<_, i64>(0).map(|v| v as u32)
        })
        .map_err(|e| AppError::Knowledge(format!("Failed to count sources: {}", e)))?;

    let chunks_count: u32 = conn
        .query_row("SELECT COUNT(*) FROM chunks", [], |row| {
            row.get::<_, i64>(0).map(|v| v as u32)
        })
        .map_err(|e| AppError::Knowledge(format!("Failed to count chunks: {}", e)))?;

    Ok((sources_count, chunks_count))
}

/// Reset the index (delete all data, manifest included).
pub fn reset_index(conn: &Connection) -> AppResult<()> {
    conn.execute_batch("DELETE FROM chunks; DELETE FROM sources; DELETE FROM manifest;")
        .map_err(|e| AppError::Knowledge(format!("Failed to reset index: {}", e)))?;

    tracing::info!("Reset vector index");
    Ok(())
}

/// Convert embedding vector to little-endian bytes for storage.
fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(embedding.len() * 4);
    for &value in embedding {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

/// Convert bytes back to embedding vector.
fn bytes_to_embedding(bytes: &[u8]) -> AppResult<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(AppError::Knowledge(
            "Invalid embedding bytes length".to_string(),
        ));
    }

    Ok(bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::TempDir;

    fn chunk(id: &str, source: &str, position: u32, embedding: Vec<f32>) -> KnowledgeChunk {
        KnowledgeChunk {
            id: id.to_string(),
            source: source.to_string(),
            position,
            text: format!("text of {}", id),
            embedding: Some(embedding),
        }
    }

    #[test]
    fn test_init_index_creates_tables() {
        let temp = TempDir::new().unwrap();
        let conn = init_index(&temp.path().join("nested/index.sqlite")).unwrap();

        let table_count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table'",
                [],
                |row| row.get(0),
            )
            .unwrap();

        assert_eq!(table_count, 3);
    }

    #[test]
    fn test_insert_and_load_chunks() {
        let temp = TempDir::new().unwrap();
        let conn = init_index(&temp.path().join("index.sqlite")).unwrap();

        insert_chunk(&conn, &chunk("c1", "a.pdf", 0, vec![1.0, 0.0, -0.5])).unwrap();
        insert_chunk(&conn, &chunk("c2", "a.pdf", 1, vec![0.0, 1.0, 0.25])).unwrap();

        let chunks = load_chunks(&conn).unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].id, "c1");
        assert_eq!(chunks[0].embedding.as_deref(), Some(&[1.0, 0.0, -0.5][..]));
        assert_eq!(chunks[1].position, 1);
        assert_eq!(chunks[1].text, "text of c2");
    }

    #[test]
    fn test_chunk_without_embedding_rejected() {
        let temp = TempDir::new().unwrap();
        let conn = init_index(&temp.path().join("index.sqlite")).unwrap();

        let mut c = chunk("c1", "a.pdf", 0, vec![]);
        c.embedding = None;
        assert!(insert_chunk(&conn, &c).is_err());
    }

    #[test]
    fn test_manifest_roundtrip() {
        let temp = TempDir::new().unwrap();
        let conn = init_index(&temp.path().join("index.sqlite")).unwrap();
        assert!(read_manifest(&conn).unwrap().is_none());

        let manifest = IndexManifest {
            provider: "gemini".to_string(),
            model: "text-embedding-004".to_string(),
            dimensions: 768,
            built_at: Utc::now(),
        };
        write_manifest(&conn, &manifest).unwrap();

        let loaded = read_manifest(&conn).unwrap().unwrap();
        assert_eq!(loaded.provider, "gemini");
        assert_eq!(loaded.model, "text-embedding-004");
        assert_eq!(loaded.dimensions, 768);
    }

    #[test]
    fn test_stats_and_reset() {
        let temp = TempDir::new().unwrap();
        let conn = init_index(&temp.path().join("index.sqlite")).unwrap();

        insert_source(
            &conn,
            &KnowledgeSource {
                id: "s1".to_string(),
                path: "a.pdf".to_string(),
                learned_at: Utc::now(),
                size_bytes: 42,
                chunk_count: 1,
            },
        )
        .unwrap();
        insert_chunk(&conn, &chunk("c1", "a.pdf", 0, vec![1.0])).unwrap();

        assert_eq!(get_stats(&conn).unwrap(), (1, 1));

        reset_index(&conn).unwrap();
        assert_eq!(get_stats(&conn).unwrap(), (0, 0));
    }

    #[test]
    fn test_open_index_missing() {
        let temp = TempDir::new().unwrap();
        let err = open_index(&temp.path().join("index.sqlite")).unwrap_err();
        assert!(err.to_string().contains("mediguide ingest"));
    }

    #[test]
    fn test_open_index_read_only() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("index.sqlite");
        drop(init_index(&path).unwrap());

        let conn = open_index(&path).unwrap();
        assert_eq!(get_stats(&conn).unwrap(), (0, 0));
        assert!(insert_chunk(&conn, &chunk("c1", "a.pdf", 0, vec![1.0])).is_err());
    }

    #[test]
    fn test_bytes_to_embedding_rejects_partial_values() {
        assert!(bytes_to_embedding(&[0, 0, 0]).is_err());
        assert_eq!(
            bytes_to_embedding(&embedding_to_bytes(&[0.5, -2.0])).unwrap(),
            vec![0.5, -2.0]
        );
    }
}
