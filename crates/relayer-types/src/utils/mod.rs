//! Utility functions for common type conversions and transformations.
//!
//! Hex and decimal parsing for request boundaries, display helpers, and the
//! EIP-712 codec used to bind a swap intent to the settlement domain.

pub mod conversion;
pub mod eip712;
pub mod formatting;
pub mod helpers;

pub use conversion::{parse_address, parse_hex_bytes, parse_u256};
pub use eip712::{
	compute_domain_separator, compute_final_digest, compute_intent_digest, compute_struct_hash,
	recover_signer, Eip712AbiEncoder, DOMAIN_TYPE, DOMAIN_TYPE_WITH_SALT, SWAP_INTENT_TYPE,
};
pub use formatting::{redact_rpc_url, without_0x_prefix};
pub use helpers::{current_timestamp, current_timestamp_millis};
