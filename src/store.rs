// 🗄️ Record Store - Where raw order/customer documents come from
//
// The analytics core only needs `RecordSource::fetch_all(collection)`.
// Two implementations:
//   - SqliteStore: documents as JSON text in SQLite (WAL), deduplicated by `id`
//   - MemoryStore: plain in-memory collections (tests, embedding)
//
// Import helpers turn CSV or JSON exports into documents.

use anyhow::{bail, Context, Result};
use rusqlite::{params, Connection};
use serde::Serialize;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::Path;

// ============================================================================
// RECORD SOURCE
// ============================================================================

pub trait RecordSource {
    /// Every document stored under `collection`, in insertion order
    fn fetch_all(&self, collection: &str) -> Result<Vec<Value>>;
}

impl<T: RecordSource + ?Sized> RecordSource for &T {
    fn fetch_all(&self, collection: &str) -> Result<Vec<Value>> {
        (**self).fetch_all(collection)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ImportSummary {
    pub inserted: usize,
    pub duplicates: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectionStat {
    pub collection: String,
    pub document_count: i64,
}

/// SHA-256 of the document's top-level `id`, or None when it has none.
///
/// `"1001"` and `1001` are the same identity, since CSV imports read every cell as text.
pub fn identity_hash(doc: &Value) -> Option<String> {
    let id = match doc.get("id")? {
        Value::Null => return None,
        Value::String(s) if s.trim().is_empty() => return None,
        Value::String(s) => s.trim().to_string(),
        other => other.to_string(),
    };

    let mut hasher = Sha256::new();
    hasher.update(id);
    Some(format!("{:x}", hasher.finalize()))
}

// ============================================================================
// SQLITE STORE
// ============================================================================

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (or create) a database file in WAL mode
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database {}", path.display()))?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    pub fn from_connection(conn: Connection) -> Result<Self> {
        setup_database(&conn)?;
        Ok(SqliteStore { conn })
    }

    /// Insert documents, skipping any whose `id` is already stored in the same collection.
    /// Documents without an `id` are always inserted.
    pub fn insert_documents(&mut self, collection: &str, docs: &[Value]) -> Result<ImportSummary> {
        let tx = self.conn.transaction()?;
        let mut summary = ImportSummary::default();

        {
            let mut stmt = tx.prepare(
                "INSERT INTO documents (collection, identity_hash, body) VALUES (?1, ?2, ?3)",
            )?;

            for doc in docs {
                let body = doc.to_string();
                match stmt.execute(params![collection, identity_hash(doc), body]) {
                    Ok(_) => summary.inserted += 1,
                    Err(rusqlite::Error::SqliteFailure(err, _))
                        if err.code == rusqlite::ErrorCode::ConstraintViolation =>
                    {
                        summary.duplicates += 1;
                    }
                    Err(e) => return Err(e.into()),
                }
            }
        }

        tx.commit()?;

        tracing::info!(
            collection,
            inserted = summary.inserted,
            duplicates = summary.duplicates,
            "imported documents"
        );

        Ok(summary)
    }

    pub fn count(&self, collection: &str) -> Result<i64> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM documents WHERE collection = ?1",
            params![collection],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    pub fn collections(&self) -> Result<Vec<CollectionStat>> {
        let mut stmt = self.conn.prepare(
            "SELECT collection, COUNT(*) FROM documents GROUP BY collection ORDER BY collection",
        )?;

        let stats = stmt
            .query_map([], |row| {
                Ok(CollectionStat {
                    collection: row.get(0)?,
                    document_count: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(stats)
    }
}

impl RecordSource for SqliteStore {
    fn fetch_all(&self, collection: &str) -> Result<Vec<Value>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, body FROM documents WHERE collection = ?1 ORDER BY id")?;

        let rows = stmt
            .query_map(params![collection], |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(id, body)| {
                serde_json::from_str(&body)
                    .with_context(|| format!("Corrupt document {} in {}", id, collection))
            })
            .collect()
    }
}

fn setup_database(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS documents (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            collection TEXT NOT NULL,
            identity_hash TEXT,
            body TEXT NOT NULL,
            imported_at DATETIME DEFAULT CURRENT_TIMESTAMP,
            UNIQUE (collection, identity_hash)
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_documents_collection ON documents(collection)",
        [],
    )?;

    Ok(())
}

// ============================================================================
// MEMORY STORE
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    collections: HashMap<String, Vec<Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_collection(mut self, collection: &str, docs: Vec<Value>) -> Self {
        self.collections
            .entry(collection.to_string())
            .or_default()
            .extend(docs);
        self
    }
}

impl RecordSource for MemoryStore {
    /// Unknown collections are empty, like a document store
    fn fetch_all(&self, collection: &str) -> Result<Vec<Value>> {
        Ok(self.collections.get(collection).cloned().unwrap_or_default())
    }
}

// ============================================================================
// IMPORT
// ============================================================================

/// Load documents from a `.csv` export or a JSON file (array or one object per line)
pub fn load_documents(path: &Path) -> Result<Vec<Value>> {
    let is_csv = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map_or(false, |ext| ext.eq_ignore_ascii_case("csv"));

    if is_csv {
        load_csv(path)
    } else {
        load_json(path)
    }
}

/// Each header is a dotted field path; empty cells are left out of the document.
///
/// `created_at,customer.id,total_price_set.shop_money.amount` becomes
/// `{"created_at": .., "customer": {"id": ..}, "total_price_set": {"shop_money": {"amount": ..}}}`
pub fn load_csv(path: &Path) -> Result<Vec<Value>> {
    let mut rdr = csv::Reader::from_path(path).context("Failed to open CSV file")?;
    let headers = rdr.headers().context("Failed to read CSV headers")?.clone();

    let mut docs = Vec::new();
    for (line, result) in rdr.records().enumerate() {
        let record = result.with_context(|| format!("Failed to read CSV row {}", line + 1))?;

        let mut doc = Value::Object(Map::new());
        for (header, cell) in headers.iter().zip(record.iter()) {
            if cell.trim().is_empty() {
                continue;
            }
            let keys: Vec<&str> = header.trim().split('.').collect();
            insert_path(&mut doc, &keys, Value::String(cell.to_string()))
                .with_context(|| format!("Bad column '{}' on CSV row {}", header, line + 1))?;
        }
        docs.push(doc);
    }

    Ok(docs)
}

pub fn load_json(path: &Path) -> Result<Vec<Value>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    if text.trim_start().starts_with('[') {
        return serde_json::from_str(&text).context("Failed to parse JSON array");
    }

    serde_json::Deserializer::from_str(&text)
        .into_iter::<Value>()
        .enumerate()
        .map(|(i, doc)| doc.with_context(|| format!("Failed to parse JSON document {}", i + 1)))
        .collect()
}

fn insert_path(doc: &mut Value, keys: &[&str], value: Value) -> Result<()> {
    let Value::Object(map) = doc else {
        bail!("'{}' collides with a scalar column", keys.join("."));
    };

    match keys {
        [] => Ok(()),
        [last] => {
            map.insert(last.to_string(), value);
            Ok(())
        }
        [head, rest @ ..] => {
            let child = map
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            insert_path(child, rest, value)
        }
    }
}
