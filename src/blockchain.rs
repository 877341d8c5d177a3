// Thin re-export module: blocks, chain validation and the ledger live in
// their own files under `blockchain/`.

pub mod block;
pub mod ledger;
pub mod validation;

pub use block::*;
pub use ledger::*;
pub use validation::*;
