use super::block::Block;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum IntegrityFault {
    /// The stored `block_hash` no longer matches the block's fields.
    HashMismatch,
    /// `previous_hash` does not point at the predecessor's `block_hash`.
    BrokenLink,
}

impl fmt::Display for IntegrityFault {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            IntegrityFault::HashMismatch => write!(f, "block hash does not match block contents"),
            IntegrityFault::BrokenLink => write!(f, "previous hash does not match preceding block"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChainFailure {
    pub index: u64,
    pub position: usize,
    pub fault: IntegrityFault,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChainReport {
    pub blocks_checked: usize,
    pub failure: Option<ChainFailure>,
}

impl ChainReport {
    pub fn is_valid(&self) -> bool {
        self.failure.is_none()
    }
}

/// Checks every consecutive pair starting at position 1. Stops at the first
/// failure. Genesis itself is not rehashed.
pub fn validate_chain(blocks: &[Block]) -> ChainReport {
    for (offset, pair) in blocks.windows(2).enumerate() {
        let (prev, curr) = (&pair[0], &pair[1]);

        let fault = match curr.recompute_hash() {
            Ok(hash) if hash == curr.block_hash() => None,
            _ => Some(IntegrityFault::HashMismatch),
        }
        .or_else(|| (curr.previous_hash() != prev.block_hash()).then_some(IntegrityFault::BrokenLink));

        if let Some(fault) = fault {
            return ChainReport {
                blocks_checked: offset + 2,
                failure: Some(ChainFailure {
                    index: curr.index(),
                    position: offset + 1,
                    fault,
                }),
            };
        }
    }

    ChainReport {
        blocks_checked: blocks.len(),
        failure: None,
    }
}
