use crate::canonical::to_canonical_vec;
use crate::error::{LedgerError, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

pub const DEFAULT_STUDENT_NAME: &str = "Unknown Holder";
pub const DEFAULT_CERT_ID: &str = "N/A";
pub const DEFAULT_VALIDITY: &str = "Lifetime";
pub const DEFAULT_STUDENT_IMAGE: &str = "";

/// `previous_hash` of the genesis block.
pub const GENESIS_PREVIOUS_HASH: &str = "0";
pub const GENESIS_DOCUMENT_TYPE: &str = "Genesis";
pub const GENESIS_ISSUER: &str = "System";
pub const GENESIS_DOCUMENT_HASH: &str = "0";

/// Caller-supplied content of one anchoring event.
///
/// Optional fields left as `None` (or set to an empty string) fall back to the
/// ledger defaults when the block is built.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub document_type: String,
    pub issuer: String,
    pub document_hash: String,
    pub student_name: Option<String>,
    pub cert_id: Option<String>,
    pub validity: Option<String>,
    pub student_image: Option<String>,
}

impl DocumentRecord {
    pub fn new(
        document_type: impl Into<String>,
        issuer: impl Into<String>,
        document_hash: impl Into<String>,
    ) -> Self {
        Self {
            document_type: document_type.into(),
            issuer: issuer.into(),
            document_hash: document_hash.into(),
            ..Default::default()
        }
    }

    pub fn with_student_name(mut self, name: impl Into<String>) -> Self {
        self.student_name = Some(name.into());
        self
    }

    pub fn with_cert_id(mut self, cert_id: impl Into<String>) -> Self {
        self.cert_id = Some(cert_id.into());
        self
    }

    pub fn with_validity(mut self, validity: impl Into<String>) -> Self {
        self.validity = Some(validity.into());
        self
    }

    pub fn with_student_image(mut self, image: impl Into<String>) -> Self {
        self.student_image = Some(image.into());
        self
    }
}

fn or_default(value: Option<String>, default: &str) -> String {
    value
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// Hashing input: the block fields minus `block_hash`, declared in sorted key order.
#[derive(Serialize)]
struct CanonicalFields<'a> {
    cert_id: &'a str,
    document_hash: &'a str,
    document_type: &'a str,
    index: u64,
    issuer: &'a str,
    previous_hash: &'a str,
    student_image: &'a str,
    student_name: &'a str,
    timestamp: f64,
    validity: &'a str,
}

/// One immutable, hash-linked anchoring event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "StoredBlock")]
pub struct Block {
    index: u64,
    timestamp: f64,
    document_type: String,
    issuer: String,
    student_name: String,
    cert_id: String,
    validity: String,
    student_image: String,
    document_hash: String,
    previous_hash: String,
    block_hash: String,
}

impl Block {
    pub fn new(
        index: u64,
        timestamp: f64,
        record: DocumentRecord,
        previous_hash: impl Into<String>,
    ) -> Result<Self> {
        let mut block = Block {
            index,
            timestamp,
            document_type: record.document_type,
            issuer: record.issuer,
            student_name: or_default(record.student_name, DEFAULT_STUDENT_NAME),
            cert_id: or_default(record.cert_id, DEFAULT_CERT_ID),
            validity: or_default(record.validity, DEFAULT_VALIDITY),
            student_image: or_default(record.student_image, DEFAULT_STUDENT_IMAGE),
            document_hash: record.document_hash,
            previous_hash: previous_hash.into(),
            block_hash: String::new(),
        };
        block.block_hash = block.recompute_hash()?;
        Ok(block)
    }

    pub fn genesis(timestamp: f64) -> Result<Self> {
        let record = DocumentRecord::new(GENESIS_DOCUMENT_TYPE, GENESIS_ISSUER, GENESIS_DOCUMENT_HASH);
        Block::new(0, timestamp, record, GENESIS_PREVIOUS_HASH)
    }

    /// SHA-256 over the canonical encoding of every field except `block_hash`.
    pub fn recompute_hash(&self) -> Result<String> {
        let fields = CanonicalFields {
            cert_id: &self.cert_id,
            document_hash: &self.document_hash,
            document_type: &self.document_type,
            index: self.index,
            issuer: &self.issuer,
            previous_hash: &self.previous_hash,
            student_image: &self.student_image,
            student_name: &self.student_name,
            timestamp: self.timestamp,
            validity: &self.validity,
        };
        let bytes = to_canonical_vec(&fields)?;
        Ok(hex::encode(Sha256::digest(&bytes)))
    }

    pub fn index(&self) -> u64 {
        self.index
    }

    pub fn timestamp(&self) -> f64 {
        self.timestamp
    }

    pub fn document_type(&self) -> &str {
        &self.document_type
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    pub fn student_name(&self) -> &str {
        &self.student_name
    }

    pub fn cert_id(&self) -> &str {
        &self.cert_id
    }

    pub fn validity(&self) -> &str {
        &self.validity
    }

    pub fn student_image(&self) -> &str {
        &self.student_image
    }

    pub fn document_hash(&self) -> &str {
        &self.document_hash
    }

    pub fn previous_hash(&self) -> &str {
        &self.previous_hash
    }

    pub fn block_hash(&self) -> &str {
        &self.block_hash
    }

    pub fn is_genesis(&self) -> bool {
        self.index == 0
    }
}

/// Persisted shape of a block, as read back from a store.
///
/// Optional fields get the same defaults as a freshly built block. A missing
/// `block_hash` is recomputed; a present one is kept as-is so verification can
/// catch records that were edited after they were written.
#[derive(Debug, Clone, Deserialize)]
pub struct StoredBlock {
    pub index: u64,
    pub timestamp: f64,
    pub document_type: String,
    pub issuer: String,
    pub document_hash: String,
    pub previous_hash: String,
    #[serde(default)]
    pub student_name: Option<String>,
    #[serde(default)]
    pub cert_id: Option<String>,
    #[serde(default)]
    pub validity: Option<String>,
    #[serde(default)]
    pub student_image: Option<String>,
    #[serde(default)]
    pub block_hash: Option<String>,
}

impl TryFrom<StoredBlock> for Block {
    type Error = LedgerError;

    fn try_from(stored: StoredBlock) -> Result<Self> {
        let record = DocumentRecord {
            document_type: stored.document_type,
            issuer: stored.issuer,
            document_hash: stored.document_hash,
            student_name: stored.student_name,
            cert_id: stored.cert_id,
            validity: stored.validity,
            student_image: stored.student_image,
        };
        let mut block = Block::new(stored.index, stored.timestamp, record, stored.previous_hash)?;
        if let Some(hash) = stored.block_hash {
            block.block_hash = hash;
        }
        Ok(block)
    }
}
