//! Common types module for the intent relayer.
//!
//! This module defines the data types shared by every relayer crate: the
//! swap intent itself and its JSON wire form, the HTTP request and response
//! bodies, nonce ledger records, executed-event records, chain receipts and
//! logs, and the EIP-712 helpers used to sign and verify intents.

/// HTTP API request, response and error types.
pub mod api;
/// Chain-facing receipt and log types.
pub mod delivery;
/// Executed-event records produced by the indexer.
pub mod events;
/// Swap intent domain type, wire form and parsing.
pub mod intent;
/// Nonce ledger entry types.
pub mod nonce;
/// Contract bindings for the settlement contract.
pub mod standards;
/// Utility functions for common type conversions.
pub mod utils;

pub use api::*;
pub use delivery::*;
pub use events::*;
pub use intent::*;
pub use nonce::*;
pub use standards::settlement::*;
pub use utils::{
	current_timestamp, current_timestamp_millis, parse_address, parse_hex_bytes, parse_u256,
	redact_rpc_url, without_0x_prefix,
};
