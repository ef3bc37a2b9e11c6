//! Parsing helpers for values arriving as strings over HTTP or config.

use alloy_primitives::{Address, Bytes, U256};

use super::formatting::without_0x_prefix;

/// Parses a 20-byte hex address with optional `0x` prefix.
///
/// Mixed-case input is accepted without enforcing the EIP-55 checksum;
/// callers render addresses back out with `to_checksum`.
pub fn parse_address(value: &str) -> Result<Address, String> {
	let trimmed = value.trim();
	let hex_part = without_0x_prefix(trimmed);
	if hex_part.len() != 40 {
		return Err(format!("Invalid address: {}", value));
	}
	let bytes = hex::decode(hex_part).map_err(|_| format!("Invalid address: {}", value))?;
	Ok(Address::from_slice(&bytes))
}

/// Parses an unsigned 256-bit integer.
///
/// Decimal is the normal form; a `0x` prefixed hex string is also accepted.
/// Empty strings, signs, separators such as `_`, and values above
/// `2^256 - 1` are rejected.
pub fn parse_u256(value: &str) -> Result<U256, String> {
	let trimmed = value.trim();
	if trimmed.is_empty() {
		return Err("Invalid integer: empty string".to_string());
	}
	let parsed = if trimmed.starts_with("0x") || trimmed.starts_with("0X") {
		let digits = without_0x_prefix(trimmed);
		if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
			return Err(format!("Invalid integer: {}", value));
		}
		U256::from_str_radix(digits, 16)
	} else {
		if !trimmed.bytes().all(|b| b.is_ascii_digit()) {
			return Err(format!("Invalid integer: {}", value));
		}
		U256::from_str_radix(trimmed, 10)
	};
	parsed.map_err(|_| format!("Invalid integer: {}", value))
}

/// Decodes a hex byte string. `"0x"` and the empty string decode to no bytes.
pub fn parse_hex_bytes(value: &str) -> Result<Bytes, String> {
	let hex_part = without_0x_prefix(value.trim());
	hex::decode(hex_part)
		.map(Bytes::from)
		.map_err(|e| format!("Invalid hex: {}", e))
}
