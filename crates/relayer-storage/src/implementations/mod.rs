//! Nonce ledger backends.

pub mod file;
pub mod memory;
