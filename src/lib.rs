//! DocuChain - a tamper-evident ledger of document fingerprints
//!
//! # Architecture
//!
//! ## Ledger core
//! - [`blockchain`] - Blocks, the ledger and chain integrity checks
//! - [`canonical`] - Canonical JSON encoding hashed into every block
//!
//! ## Storage
//! - [`persistence`] - Storage trait plus JSON file, SQLite and in-memory backends
//!
//! ## Collaborator helpers
//! - [`crypto`] - Document fingerprints and certificate ids
//! - [`view`] - Public and authenticated block listings
//!
//! ## Configuration & Utilities
//! - [`config`] - Configuration management
//! - [`error`] - Error types

#![forbid(unsafe_code)]

// ============================================================================
// Ledger core
// ============================================================================
pub mod blockchain;
pub mod canonical;

// ============================================================================
// Storage
// ============================================================================
pub mod persistence;

// ============================================================================
// Collaborator helpers
// ============================================================================
pub mod crypto;
pub mod view;

// ============================================================================
// Configuration & Utilities
// ============================================================================
pub mod config;
pub mod error;

pub use blockchain::{Block, DocumentRecord, Ledger};
pub use error::{LedgerError, Result};
