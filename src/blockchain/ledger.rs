use super::block::{Block, DocumentRecord};
use super::validation::{validate_chain, ChainReport};
use crate::config::StorageConfig;
use crate::error::{LedgerError, Result};
use crate::persistence::{open_store, BlockStore, InMemoryStore};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

/// Current time as fractional seconds since the Unix epoch.
pub fn now_timestamp() -> f64 {
    chrono::Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

/// The hash-chained document ledger.
///
/// The in-memory sequence is the source of truth for reads; every mutation is
/// written through to the store before it becomes visible. All operations
/// take `&self`, so a ledger can be shared behind an `Arc`.
pub struct Ledger {
    chain: Mutex<Vec<Block>>,
    store: Box<dyn BlockStore>,
}

impl Ledger {
    /// Wraps `store` and loads the persisted chain, creating genesis if needed.
    pub fn open(store: Box<dyn BlockStore>) -> Result<Self> {
        let ledger = Ledger {
            chain: Mutex::new(Vec::new()),
            store,
        };
        ledger.load()?;
        Ok(ledger)
    }

    /// Opens the configured backend and loads it.
    pub fn from_config(config: &StorageConfig) -> Result<Self> {
        Self::open(open_store(config)?)
    }

    /// A ledger over a fresh [`InMemoryStore`].
    pub fn in_memory() -> Result<Self> {
        Self::open(Box::new(InMemoryStore::new()))
    }

    /// Reloads the chain from the store and returns it.
    ///
    /// An empty store gets a genesis block. A store that reports corrupted
    /// contents is reset to a fresh genesis block after logging the reason.
    pub fn load(&self) -> Result<Vec<Block>> {
        let mut chain = self.chain.lock();

        let blocks = match self.store.load_blocks() {
            Ok(blocks) if blocks.is_empty() => {
                let genesis = Block::genesis(now_timestamp())?;
                self.store.append_block(&genesis)?;
                info!("Created genesis block {}", genesis.block_hash());
                vec![genesis]
            }
            Ok(blocks) => blocks,
            Err(LedgerError::StorageCorrupted(reason)) => {
                warn!("Stored chain is corrupted ({}); resetting to a fresh genesis block", reason);
                let genesis = Block::genesis(now_timestamp())?;
                self.store.reset(&genesis)?;
                vec![genesis]
            }
            Err(e) => return Err(e),
        };

        debug!("Loaded {} blocks", blocks.len());
        *chain = blocks.clone();
        Ok(blocks)
    }

    /// Appends a block for `record` on top of the current last block.
    pub fn append(&self, record: DocumentRecord) -> Result<Block> {
        self.append_at(record, now_timestamp())
    }

    /// Like [`Ledger::append`] with a caller-chosen timestamp, for seeding history.
    pub fn append_backdated(&self, record: DocumentRecord, timestamp: f64) -> Result<Block> {
        if !timestamp.is_finite() {
            return Err(LedgerError::InvalidTimestamp(timestamp));
        }
        self.append_at(record, timestamp)
    }

    fn append_at(&self, record: DocumentRecord, timestamp: f64) -> Result<Block> {
        // Held across read-last, build, persist and push.
        let mut chain = self.chain.lock();

        let block = {
            let last = chain.last().ok_or(LedgerError::NoAnchorBlock)?;
            Block::new(last.index() + 1, timestamp, record, last.block_hash())?
        };

        self.store.append_block(&block)?;
        chain.push(block.clone());

        info!(
            "Anchored document {} at index {} (block {})",
            block.document_hash(),
            block.index(),
            block.block_hash()
        );
        Ok(block)
    }

    pub fn verify(&self) -> bool {
        self.verify_report().is_valid()
    }

    pub fn verify_report(&self) -> ChainReport {
        validate_chain(&self.chain.lock())
    }

    /// First block (lowest index) anchoring `document_hash`.
    pub fn find_by_document_hash(&self, document_hash: &str) -> Option<Block> {
        self.chain
            .lock()
            .iter()
            .find(|b| b.document_hash() == document_hash)
            .cloned()
    }

    pub fn blocks_for_holder(&self, student_name: &str) -> Vec<Block> {
        self.filter_blocks(|b| b.student_name() == student_name)
    }

    pub fn blocks_by_issuer(&self, issuer: &str) -> Vec<Block> {
        self.filter_blocks(|b| b.issuer() == issuer)
    }

    fn filter_blocks(&self, predicate: impl Fn(&Block) -> bool) -> Vec<Block> {
        self.chain
            .lock()
            .iter()
            .filter(|b| predicate(b))
            .cloned()
            .collect()
    }

    pub fn latest_block(&self) -> Option<Block> {
        self.chain.lock().last().cloned()
    }

    pub fn blocks(&self) -> Vec<Block> {
        self.chain.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.chain.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.chain.lock().is_empty()
    }
}
