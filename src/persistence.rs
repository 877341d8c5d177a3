//! Storage backends for the ledger.
//!
//! Every backend returns blocks ordered by index and only ever appends; the
//! single exception is [`BlockStore::reset`], which the ledger calls after a
//! store has reported corrupted contents.

use crate::blockchain::{Block, StoredBlock};
use crate::config::{StorageBackend, StorageConfig};
use crate::error::{LedgerError, Result};
use parking_lot::Mutex;
use rusqlite::{params, Connection, ErrorCode};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::NamedTempFile;

/// Abstraction for ledger storage.
pub trait BlockStore: Send + Sync {
    /// All stored blocks, ascending by index.
    fn load_blocks(&self) -> Result<Vec<Block>>;

    /// Durably appends one block. Returns only after the write is committed.
    fn append_block(&self, block: &Block) -> Result<()>;

    /// Discards the stored chain and replaces it with `genesis`.
    fn reset(&self, genesis: &Block) -> Result<()>;
}

/// Opens the backend selected in `config`, creating parent directories as needed.
pub fn open_store(config: &StorageConfig) -> Result<Box<dyn BlockStore>> {
    match config.backend {
        StorageBackend::Memory => Ok(Box::new(InMemoryStore::new())),
        StorageBackend::File => {
            ensure_parent_dir(Path::new(&config.path))?;
            Ok(Box::new(JsonFileStore::new(&config.path)))
        }
        StorageBackend::Sqlite => {
            ensure_parent_dir(Path::new(&config.path))?;
            Ok(Box::new(SqliteStore::open(&config.path)?))
        }
    }
}

fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| {
                LedgerError::IoError(format!("Failed to create data dir {:?}: {}", parent, e))
            })?;
        }
    }
    Ok(())
}

// ============================================================================
// JSON file store
// ============================================================================

/// Bulk-rewrite store: the whole chain lives in one JSON array that is
/// rewritten atomically on every append.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<Vec<Block>> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(LedgerError::IoError(format!(
                    "Failed to read {}: {}",
                    self.path.display(),
                    e
                )))
            }
        };

        if contents.trim().is_empty() {
            return Ok(Vec::new());
        }

        let mut blocks: Vec<Block> = serde_json::from_str(&contents).map_err(|e| {
            LedgerError::StorageCorrupted(format!("{}: {}", self.path.display(), e))
        })?;
        blocks.sort_by_key(Block::index);
        Ok(blocks)
    }

    fn write_all(&self, blocks: &[Block]) -> Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        // Temp file in the target directory so the final rename stays on one filesystem.
        let mut file = NamedTempFile::new_in(&dir)
            .map_err(|e| LedgerError::IoError(format!("Failed to create temp file: {}", e)))?;

        let json = serde_json::to_string_pretty(blocks)?;
        file.write_all(json.as_bytes())
            .map_err(|e| LedgerError::IoError(format!("Failed to write chain: {}", e)))?;
        file.as_file()
            .sync_all()
            .map_err(|e| LedgerError::IoError(format!("Failed to sync file: {}", e)))?;

        file.persist(&self.path)
            .map_err(|e| LedgerError::IoError(format!("Failed to finalize write: {}", e)))?;
        Ok(())
    }

    fn quarantine_path(&self) -> PathBuf {
        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "blockchain.json".to_string());
        let stamp = chrono::Utc::now().format("%Y%m%dT%H%M%S");
        self.path.with_file_name(format!("{}.corrupt-{}", file_name, stamp))
    }
}

impl BlockStore for JsonFileStore {
    fn load_blocks(&self) -> Result<Vec<Block>> {
        self.read_all()
    }

    fn append_block(&self, block: &Block) -> Result<()> {
        let mut blocks = self.read_all()?;
        if blocks.iter().any(|b| b.index() == block.index()) {
            return Err(LedgerError::DuplicateIndex(block.index()));
        }
        blocks.push(block.clone());
        self.write_all(&blocks)
    }

    fn reset(&self, genesis: &Block) -> Result<()> {
        if self.path.exists() {
            let quarantine = self.quarantine_path();
            fs::rename(&self.path, &quarantine).map_err(|e| {
                LedgerError::IoError(format!("Failed to quarantine corrupted chain: {}", e))
            })?;
            tracing::warn!("Corrupted chain file preserved at {}", quarantine.display());
        }
        self.write_all(std::slice::from_ref(genesis))
    }
}

// ============================================================================
// SQLite store
// ============================================================================

/// Incremental store: one row per block, inserted once and never updated.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

const BLOCK_COLUMNS: &str = "idx, timestamp, document_type, issuer, student_name, cert_id, \
                             validity, student_image, document_hash, previous_hash, block_hash";

impl SqliteStore {
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .map_err(|e| LedgerError::DatabaseError(format!("Failed to open database: {}", e)))?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS blocks (
                idx INTEGER PRIMARY KEY,
                timestamp REAL NOT NULL,
                document_type TEXT NOT NULL,
                issuer TEXT NOT NULL,
                student_name TEXT NOT NULL,
                cert_id TEXT NOT NULL,
                validity TEXT NOT NULL,
                student_image TEXT NOT NULL,
                document_hash TEXT NOT NULL,
                previous_hash TEXT NOT NULL,
                block_hash TEXT NOT NULL
            )",
            [],
        )
        .map_err(|e| LedgerError::DatabaseError(format!("Failed to create blocks table: {}", e)))?;

        Ok(SqliteStore { conn: Mutex::new(conn) })
    }

    /// Runs `f` against the underlying connection.
    pub fn with_connection<T>(&self, f: impl FnOnce(&Connection) -> rusqlite::Result<T>) -> Result<T> {
        let conn = self.conn.lock();
        f(&conn).map_err(LedgerError::from)
    }

    fn insert(conn: &Connection, block: &Block) -> Result<()> {
        let sql = format!(
            "INSERT INTO blocks ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            BLOCK_COLUMNS
        );
        let index = i64::try_from(block.index())
            .map_err(|_| LedgerError::DatabaseError(format!("Index {} out of range", block.index())))?;

        conn.execute(
            &sql,
            params![
                index,
                block.timestamp(),
                block.document_type(),
                block.issuer(),
                block.student_name(),
                block.cert_id(),
                block.validity(),
                block.student_image(),
                block.document_hash(),
                block.previous_hash(),
                block.block_hash(),
            ],
        )
        .map_err(|e| match e {
            rusqlite::Error::SqliteFailure(err, _) if err.code == ErrorCode::ConstraintViolation => {
                LedgerError::DuplicateIndex(block.index())
            }
            e => LedgerError::DatabaseError(format!("Failed to save block: {}", e)),
        })?;
        Ok(())
    }
}

fn is_decode_error(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::InvalidColumnType(..)
            | rusqlite::Error::FromSqlConversionFailure(..)
            | rusqlite::Error::IntegralValueOutOfRange(..)
    )
}

impl BlockStore for SqliteStore {
    fn load_blocks(&self) -> Result<Vec<Block>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(&format!("SELECT {} FROM blocks ORDER BY idx ASC", BLOCK_COLUMNS))
            .map_err(|e| LedgerError::DatabaseError(format!("Failed to prepare query: {}", e)))?;

        let rows = stmt
            .query_map([], |row| {
                let index: i64 = row.get(0)?;
                let index = u64::try_from(index)
                    .map_err(|_| rusqlite::Error::IntegralValueOutOfRange(0, index))?;
                Ok(StoredBlock {
                    index,
                    timestamp: row.get(1)?,
                    document_type: row.get(2)?,
                    issuer: row.get(3)?,
                    student_name: row.get(4)?,
                    cert_id: row.get(5)?,
                    validity: row.get(6)?,
                    student_image: row.get(7)?,
                    document_hash: row.get(8)?,
                    previous_hash: row.get(9)?,
                    block_hash: row.get(10)?,
                })
            })
            .map_err(|e| LedgerError::DatabaseError(format!("Failed to query blocks: {}", e)))?;

        let mut blocks = Vec::new();
        for row in rows {
            let stored = row.map_err(|e| {
                if is_decode_error(&e) {
                    LedgerError::StorageCorrupted(format!("Undecodable block row: {}", e))
                } else {
                    LedgerError::DatabaseError(format!("Failed to load block: {}", e))
                }
            })?;
            blocks.push(Block::try_from(stored)?);
        }
        Ok(blocks)
    }

    fn append_block(&self, block: &Block) -> Result<()> {
        let conn = self.conn.lock();
        SqliteStore::insert(&conn, block)
    }

    fn reset(&self, genesis: &Block) -> Result<()> {
        let conn = self.conn.lock();
        let tx = conn.unchecked_transaction().map_err(|e| {
            LedgerError::DatabaseError(format!("Failed to start transaction: {}", e))
        })?;

        // Keep the unreadable rows around for inspection.
        tx.execute(
            "CREATE TABLE IF NOT EXISTS quarantined_blocks AS
             SELECT *, 0.0 AS quarantined_at FROM blocks WHERE 0",
            [],
        )?;
        let moved = tx.execute(
            "INSERT INTO quarantined_blocks SELECT *, ?1 FROM blocks",
            params![chrono::Utc::now().timestamp() as f64],
        )?;
        tx.execute("DELETE FROM blocks", [])?;
        SqliteStore::insert(&tx, genesis)?;

        tx.commit().map_err(|e| {
            LedgerError::DatabaseError(format!("Failed to commit transaction: {}", e))
        })?;

        if moved > 0 {
            tracing::warn!("Moved {} corrupted block rows to quarantined_blocks", moved);
        }
        Ok(())
    }
}

// ============================================================================
// In-memory store
// ============================================================================

/// Simple in-memory store useful for tests and ephemeral runs.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    blocks: Arc<Mutex<Vec<Block>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the stored sequence wholesale.
    pub fn replace_blocks(&self, blocks: Vec<Block>) {
        *self.blocks.lock() = blocks;
    }

    pub fn len(&self) -> usize {
        self.blocks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl BlockStore for InMemoryStore {
    fn load_blocks(&self) -> Result<Vec<Block>> {
        let mut blocks = self.blocks.lock().clone();
        blocks.sort_by_key(Block::index);
        Ok(blocks)
    }

    fn append_block(&self, block: &Block) -> Result<()> {
        let mut blocks = self.blocks.lock();
        if blocks.iter().any(|b| b.index() == block.index()) {
            return Err(LedgerError::DuplicateIndex(block.index()));
        }
        blocks.push(block.clone());
        Ok(())
    }

    fn reset(&self, genesis: &Block) -> Result<()> {
        *self.blocks.lock() = vec![genesis.clone()];
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::DocumentRecord;
    use tempfile::TempDir;

    fn chain_of(len: u64) -> Vec<Block> {
        let mut blocks = vec![Block::genesis(1700000000.0).unwrap()];
        for i in 1..len {
            let prev = blocks.last().unwrap().block_hash().to_string();
            let record = DocumentRecord::new("Cert", "Issuer", format!("{:064x}", i));
            blocks.push(Block::new(i, 1700000000.0 + i as f64, record, prev).unwrap());
        }
        blocks
    }

    fn exercise_append_and_load(store: &dyn BlockStore) {
        assert!(store.load_blocks().unwrap().is_empty());
        let blocks = chain_of(3);
        for block in &blocks {
            store.append_block(block).unwrap();
        }
        assert_eq!(store.load_blocks().unwrap(), blocks);

        let dup = store.append_block(&blocks[1]);
        assert!(matches!(dup, Err(LedgerError::DuplicateIndex(1))));
        assert_eq!(store.load_blocks().unwrap().len(), 3);
    }

    #[test]
    fn test_memory_store_append_and_load() {
        exercise_append_and_load(&InMemoryStore::new());
    }

    #[test]
    fn test_file_store_append_and_load() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::new(dir.path().join("blockchain.json"));
        exercise_append_and_load(&store);

        // The file holds a plain JSON array of block records.
        let raw = fs::read_to_string(store.path()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value.as_array().unwrap().len(), 3);
        assert_eq!(value[0]["previous_hash"], "0");
    }

    #[test]
    fn test_sqlite_store_append_and_load() {
        exercise_append_and_load(&SqliteStore::open(":memory:").unwrap());
    }

    #[test]
    fn test_sqlite_store_orders_by_index() {
        let store = SqliteStore::open(":memory:").unwrap();
        let blocks = chain_of(3);
        store.append_block(&blocks[2]).unwrap();
        store.append_block(&blocks[0]).unwrap();
        store.append_block(&blocks[1]).unwrap();
        let indices: Vec<u64> = store.load_blocks().unwrap().iter().map(Block::index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
    }

    #[test]
    fn test_file_store_reports_corruption() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("blockchain.json");
        fs::write(&path, "{ not json").unwrap();
        let store = JsonFileStore::new(&path);
        assert!(matches!(store.load_blocks(), Err(LedgerError::StorageCorrupted(_))));
    }

    #[test]
    fn test_file_store_reset_quarantines_old_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("blockchain.json");
        fs::write(&path, "garbage").unwrap();
        let store = JsonFileStore::new(&path);

        let genesis = Block::genesis(1700000000.0).unwrap();
        store.reset(&genesis).unwrap();

        assert_eq!(store.load_blocks().unwrap(), vec![genesis]);
        let quarantined: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().contains(".corrupt-"))
            .collect();
        assert_eq!(quarantined.len(), 1);
        assert_eq!(fs::read_to_string(quarantined[0].path()).unwrap(), "garbage");
    }

    #[test]
    fn test_sqlite_store_reports_corruption() {
        let store = SqliteStore::open(":memory:").unwrap();
        store.append_block(&chain_of(1)[0]).unwrap();
        store
            .with_connection(|conn| conn.execute("UPDATE blocks SET timestamp = 'yesterday'", []))
            .unwrap();
        assert!(matches!(store.load_blocks(), Err(LedgerError::StorageCorrupted(_))));
    }

    #[test]
    fn test_sqlite_store_reset_quarantines_rows() {
        let store = SqliteStore::open(":memory:").unwrap();
        for block in chain_of(2) {
            store.append_block(&block).unwrap();
        }

        let genesis = Block::genesis(1800000000.0).unwrap();
        store.reset(&genesis).unwrap();

        assert_eq!(store.load_blocks().unwrap(), vec![genesis]);
        let quarantined: i64 = store
            .with_connection(|conn| {
                conn.query_row("SELECT COUNT(*) FROM quarantined_blocks", [], |row| row.get(0))
            })
            .unwrap();
        assert_eq!(quarantined, 2);
    }

    #[test]
    fn test_open_store_creates_parent_dir() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("chain.db");
        let config = StorageConfig {
            backend: StorageBackend::Sqlite,
            path: path.to_string_lossy().into_owned(),
        };
        let store = open_store(&config).unwrap();
        assert!(store.load_blocks().unwrap().is_empty());
        assert!(path.exists());
    }
}
