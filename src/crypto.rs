//! Document fingerprinting helpers for DocuChain

use crate::error::{LedgerError, Result};
use md5::Md5;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Length of a hex-encoded SHA-256 digest.
pub const DOCUMENT_HASH_LEN: usize = 64;

/// Lowercase hex SHA-256 of the exact document bytes.
pub fn hash_document(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Streams a file through SHA-256 and returns its lowercase hex digest.
pub fn hash_file(path: &Path) -> Result<String> {
    let file = File::open(path)
        .map_err(|e| LedgerError::IoError(format!("Failed to open {}: {}", path.display(), e)))?;
    let mut reader = BufReader::new(file);
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 8192];
    loop {
        let read = reader
            .read(&mut buf)
            .map_err(|e| LedgerError::IoError(format!("Failed to read {}: {}", path.display(), e)))?;
        if read == 0 {
            break;
        }
        hasher.update(&buf[..read]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// True for a 64 character lowercase hex string.
pub fn is_document_hash(s: &str) -> bool {
    s.len() == DOCUMENT_HASH_LEN && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

/// Short human-facing certificate id: the first 8 hex digits, uppercased, of
/// MD5 over the holder name followed by the document hash.
pub fn derive_cert_id(student_name: &str, document_hash: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(student_name.as_bytes());
    hasher.update(document_hash.as_bytes());
    hex::encode(hasher.finalize())[..8].to_ascii_uppercase()
}
