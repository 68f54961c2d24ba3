//! Document index — persistent chunk index over local documents.
//!
//! Backing store is a single SQLite database under the configured storage
//! directory: a `doc_metadata` table (one row per source document, deduped
//! by content hash) and a `chunks` FTS5 virtual table ranked with BM25 at
//! query time. Document text itself stays in the data directory; the index
//! holds chunks only.
//!
//! [`DocIndex::ensure`] mirrors the classic build-or-load pattern: when the
//! storage directory does not exist yet the data directory is walked and
//! indexed, otherwise the existing database is reloaded as-is.

pub mod query;

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use rusqlite::{Connection, params};
use sha2::{Digest, Sha256};
use text_splitter::MarkdownSplitter;
use tracing::{debug, info, warn};

use crate::config::IndexConfig;
use crate::error::AppError;

const DB_FILENAME: &str = "chunks.db";
const SCHEMA_VERSION: i64 = 1;

/// File extensions picked up when walking the data directory.
const INDEXABLE_EXTENSIONS: [&str; 3] = ["md", "markdown", "txt"];

#[derive(Debug, Clone)]
pub struct DocIndex {
    db_path: PathBuf,
}

/// Descriptor stored in `doc_metadata`.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct DocMetadata {
    pub doc_id: String,
    pub title: String,
    /// Free-form origin tag (file path, URL, …).
    pub source: String,
    pub content_hash: String,
    pub created_at: String,
}

/// A single text chunk, the unit of FTS indexing.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Chunk {
    /// Unique chunk identifier (UUID v7).
    pub id: String,
    /// ID of the parent document.
    pub doc_id: String,
    pub text: String,
    /// Byte offset of this chunk in the original document.
    pub position: usize,
}

/// A single FTS result: the matched chunk, its relevance score, and its
/// parent document metadata.
///
/// `score` is derived from the BM25 rank returned by FTS5 (negated so that
/// higher is better).
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub chunk: Chunk,
    pub score: f32,
    pub doc: DocMetadata,
}

impl DocIndex {
    /// Build-or-load entry point.
    ///
    /// Returns the index plus `true` when a fresh index was built from the
    /// data directory, `false` when an existing one was loaded.
    pub fn ensure(config: &IndexConfig) -> Result<(Self, bool), AppError> {
        if config.storage_dir.exists() {
            info!(storage_dir = %config.storage_dir.display(), "loading index");
            let index = Self::open(&config.storage_dir)?;
            info!(documents = index.list_documents()?.len(), "finished loading index");
            return Ok((index, false));
        }

        info!(
            data_dir = %config.data_dir.display(),
            storage_dir = %config.storage_dir.display(),
            "creating new index"
        );
        let index = Self::open(&config.storage_dir)?;
        let ingested = index.ingest_dir(&config.data_dir, config.chunk_size)?;
        info!(documents = ingested, storage_dir = %config.storage_dir.display(), "finished creating new index");
        Ok((index, true))
    }

    /// Open (creating if needed) the index database under `storage_dir`.
    pub fn open(storage_dir: &Path) -> Result<Self, AppError> {
        fs::create_dir_all(storage_dir).map_err(|e| {
            AppError::Index(format!("cannot create {}: {e}", storage_dir.display()))
        })?;
        let index = Self { db_path: storage_dir.join(DB_FILENAME) };
        index.init_db()?;
        Ok(index)
    }

    /// Walk `data_dir` (non-recursive, sorted) and ingest every indexable
    /// file. Returns the number of files ingested. Unreadable files are
    /// skipped with a warning rather than aborting the whole build.
    pub fn ingest_dir(&self, data_dir: &Path, chunk_size: usize) -> Result<usize, AppError> {
        let entries = fs::read_dir(data_dir)
            .map_err(|e| AppError::Index(format!("cannot read {}: {e}", data_dir.display())))?;

        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file() && has_indexable_extension(p))
            .collect();
        paths.sort();

        let mut ingested = 0;
        for path in paths {
            let content = match fs::read_to_string(&path) {
                Ok(text) => text,
                Err(e) => {
                    warn!(path = %path.display(), "skipping unreadable file: {e}");
                    continue;
                }
            };
            if content.trim().is_empty() {
                debug!(path = %path.display(), "skipping empty file");
                continue;
            }
            let title = path
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_else(|| "untitled".to_string());
            self.ingest_document(&title, &path.display().to_string(), &content, chunk_size)?;
            ingested += 1;
        }
        Ok(ingested)
    }

    /// Add one document and (re)index its chunks. Content already present
    /// under the same hash is a no-op, so re-ingestion is idempotent.
    pub fn ingest_document(
        &self,
        title: &str,
        source: &str,
        content: &str,
        chunk_size: usize,
    ) -> Result<String, AppError> {
        if chunk_size == 0 {
            return Err(AppError::Index("chunk_size must be > 0".into()));
        }

        let content_hash = sha256_hex(content);
        let mut conn = self.open_conn()?;

        if let Some(existing) = find_doc_id_by_hash(&conn, &content_hash)? {
            debug!(title, doc_id = %existing, "document already indexed");
            return Ok(existing);
        }

        let doc_id = uuid::Uuid::now_v7().to_string();
        let chunks = split_chunks(&doc_id, content, chunk_size);

        let tx = conn
            .transaction()
            .map_err(|e| AppError::Index(format!("begin tx: {e}")))?;

        tx.execute(
            "INSERT INTO doc_metadata (doc_id, title, source, content_hash, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![doc_id, title, source, content_hash, now_iso8601()],
        )
        .map_err(|e| AppError::Index(format!("insert metadata: {e}")))?;

        for chunk in &chunks {
            tx.execute(
                "INSERT INTO chunks (id, doc_id, text, position) VALUES (?1, ?2, ?3, ?4)",
                params![chunk.id, chunk.doc_id, chunk.text, chunk.position as i64],
            )
            .map_err(|e| AppError::Index(format!("insert chunk: {e}")))?;
        }

        tx.commit()
            .map_err(|e| AppError::Index(format!("commit ingest: {e}")))?;

        debug!(title, doc_id = %doc_id, chunks = chunks.len(), "document indexed");
        Ok(doc_id)
    }

    pub fn list_documents(&self) -> Result<Vec<DocMetadata>, AppError> {
        let conn = self.open_conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT doc_id, title, source, content_hash, created_at FROM doc_metadata ORDER BY created_at DESC",
            )
            .map_err(|e| AppError::Index(format!("prepare list_documents: {e}")))?;

        let rows = stmt
            .query_map([], |row| {
                Ok(DocMetadata {
                    doc_id: row.get(0)?,
                    title: row.get(1)?,
                    source: row.get(2)?,
                    content_hash: row.get(3)?,
                    created_at: row.get(4)?,
                })
            })
            .map_err(|e| AppError::Index(format!("query list_documents: {e}")))?;

        let mut docs = Vec::new();
        for row in rows {
            docs.push(row.map_err(|e| AppError::Index(format!("map document row: {e}")))?);
        }
        Ok(docs)
    }

    pub fn delete_document(&self, doc_id: &str) -> Result<(), AppError> {
        let mut conn = self.open_conn()?;
        let tx = conn
            .transaction()
            .map_err(|e| AppError::Index(format!("begin delete tx: {e}")))?;

        tx.execute("DELETE FROM chunks WHERE doc_id = ?1", params![doc_id])
            .map_err(|e| AppError::Index(format!("delete chunks for {doc_id}: {e}")))?;
        tx.execute("DELETE FROM doc_metadata WHERE doc_id = ?1", params![doc_id])
            .map_err(|e| AppError::Index(format!("delete metadata for {doc_id}: {e}")))?;

        tx.commit()
            .map_err(|e| AppError::Index(format!("commit delete tx: {e}")))
    }

    /// BM25-ranked full-text search over all indexed chunks.
    pub fn search(&self, query: &str, top_k: usize) -> Result<Vec<SearchResult>, AppError> {
        if query.trim().is_empty() || top_k == 0 {
            return Ok(Vec::new());
        }

        let match_expr = build_fts5_query(query);
        let conn = self.open_conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT
                    chunks.id,
                    chunks.doc_id,
                    chunks.text,
                    chunks.position,
                    bm25(chunks) AS rank,
                    doc_metadata.title,
                    doc_metadata.source,
                    doc_metadata.content_hash,
                    doc_metadata.created_at
                 FROM chunks
                 JOIN doc_metadata ON doc_metadata.doc_id = chunks.doc_id
                 WHERE chunks MATCH ?1
                 ORDER BY rank
                 LIMIT ?2",
            )
            .map_err(|e| AppError::Index(format!("prepare search: {e}")))?;

        let rows = stmt
            .query_map(params![match_expr, top_k as i64], |row| {
                let score = {
                    let bm25_score: f64 = row.get(4)?;
                    (-bm25_score) as f32
                };
                Ok(SearchResult {
                    chunk: Chunk {
                        id: row.get(0)?,
                        doc_id: row.get(1)?,
                        text: row.get(2)?,
                        position: row.get::<_, i64>(3)? as usize,
                    },
                    score,
                    doc: DocMetadata {
                        doc_id: row.get(1)?,
                        title: row.get(5)?,
                        source: row.get(6)?,
                        content_hash: row.get(7)?,
                        created_at: row.get(8)?,
                    },
                })
            })
            .map_err(|e| AppError::Index(format!("execute search: {e}")))?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row.map_err(|e| AppError::Index(format!("map search row: {e}")))?);
        }
        Ok(results)
    }

    fn init_db(&self) -> Result<(), AppError> {
        let conn = self.open_conn()?;
        let version: i64 = conn
            .query_row("PRAGMA user_version;", [], |row| row.get(0))
            .map_err(|e| AppError::Index(format!("read schema version: {e}")))?;

        if version == 0 {
            conn.execute_batch(
                "
                CREATE TABLE IF NOT EXISTS doc_metadata (
                    doc_id TEXT PRIMARY KEY,
                    title TEXT NOT NULL,
                    source TEXT NOT NULL,
                    content_hash TEXT NOT NULL UNIQUE,
                    created_at TEXT NOT NULL
                );

                CREATE VIRTUAL TABLE IF NOT EXISTS chunks USING fts5(
                    id UNINDEXED,
                    doc_id UNINDEXED,
                    text,
                    position UNINDEXED
                );

                PRAGMA user_version = 1;
                ",
            )
            .map_err(|e| AppError::Index(format!("initialize schema: {e}")))?;
            return Ok(());
        }

        if version != SCHEMA_VERSION {
            return Err(AppError::Index(format!(
                "unsupported schema version {version}, expected {SCHEMA_VERSION}"
            )));
        }

        Ok(())
    }

    fn open_conn(&self) -> Result<Connection, AppError> {
        let conn = Connection::open(&self.db_path)
            .map_err(|e| AppError::Index(format!("open {}: {e}", self.db_path.display())))?;

        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(|e| AppError::Index(format!("set journal_mode WAL: {e}")))?;
        conn.pragma_update(None, "busy_timeout", 5000)
            .map_err(|e| AppError::Index(format!("set busy_timeout: {e}")))?;

        Ok(conn)
    }
}

/// Split `content` into Markdown-aware chunks of at most `chunk_size` chars.
fn split_chunks(doc_id: &str, content: &str, chunk_size: usize) -> Vec<Chunk> {
    let splitter = MarkdownSplitter::new(chunk_size);
    splitter
        .chunk_indices(content)
        .filter(|(_, text)| !text.trim().is_empty())
        .map(|(position, text)| Chunk {
            id: uuid::Uuid::now_v7().to_string(),
            doc_id: doc_id.to_string(),
            text: text.to_string(),
            position,
        })
        .collect()
}

fn has_indexable_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            let lower = e.to_ascii_lowercase();
            INDEXABLE_EXTENSIONS.iter().any(|x| *x == lower)
        })
        .unwrap_or(false)
}

fn find_doc_id_by_hash(conn: &Connection, content_hash: &str) -> Result<Option<String>, AppError> {
    let mut stmt = conn
        .prepare("SELECT doc_id FROM doc_metadata WHERE content_hash = ?1")
        .map_err(|e| AppError::Index(format!("prepare find by hash: {e}")))?;

    let mut rows = stmt
        .query(params![content_hash])
        .map_err(|e| AppError::Index(format!("query find by hash: {e}")))?;

    if let Some(row) = rows
        .next()
        .map_err(|e| AppError::Index(format!("read find by hash row: {e}")))?
    {
        let doc_id: String = row
            .get(0)
            .map_err(|e| AppError::Index(format!("decode find by hash row: {e}")))?;
        return Ok(Some(doc_id));
    }
    Ok(None)
}

/// Return the lowercase hex-encoded SHA-256 digest of `content`.
fn sha256_hex(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

fn now_iso8601() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Build an FTS5 `MATCH` expression from a natural-language query.
///
/// Two concerns at once:
/// - FTS5 parses the argument to `MATCH` with its own mini-language, so
///   characters like `?`, `"`, `(` are significant. Parameter binding only
///   protects against SQL injection, not FTS syntax errors. Any token
///   containing a non-alphanumeric character is wrapped in double-quotes
///   with internal quotes doubled.
/// - Queries arrive as whole questions ("how does dengue spread?"), and
///   FTS5's implicit AND would require every word to appear. Tokens are
///   OR-joined instead; BM25 still ranks chunks matching more terms first.
fn build_fts5_query(query: &str) -> String {
    query
        .split_whitespace()
        .map(|tok| {
            if tok.chars().all(|c| c.is_alphanumeric()) {
                tok.to_string()
            } else {
                let escaped = tok.replace('"', "\"\"");
                format!("\"{}\"", escaped)
            }
        })
        .collect::<Vec<_>>()
        .join(" OR ")
}
