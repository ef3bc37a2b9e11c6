//! Swap intent types.
//!
//! A swap intent is an off-chain authorization by `signer` to swap
//! `amount_in` of `token_in` for at least `min_amount_out` of `token_out`
//! through `adapter`, valid until `deadline` and single-use per `nonce`.
//! [`SwapIntent`] is the typed form used internally; [`SwapIntentWire`] is
//! the all-strings JSON form exchanged with clients.

use alloy_primitives::{Address, Bytes, U256};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::standards::settlement::SolSwapIntent;
use crate::utils::{parse_address, parse_hex_bytes, parse_u256};

/// Errors raised while parsing a wire intent into its typed form.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IntentParseError {
	#[error("{field}: {reason}")]
	InvalidField { field: &'static str, reason: String },
}

impl IntentParseError {
	fn field(field: &'static str) -> impl FnOnce(String) -> Self {
		move |reason| IntentParseError::InvalidField { field, reason }
	}
}

/// Typed swap intent, field order matching the EIP-712 type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapIntent {
	pub signer: Address,
	pub adapter: Address,
	pub token_in: Address,
	pub token_out: Address,
	pub amount_in: U256,
	pub min_amount_out: U256,
	/// Unix seconds after which the intent is void.
	pub deadline: U256,
	pub nonce: U256,
	/// Opaque adapter parameters; see [`encode_adapter_data`].
	pub adapter_data: Bytes,
}

impl SwapIntent {
	/// Converts to the ABI tuple passed to `execute`.
	pub fn to_sol(&self) -> SolSwapIntent {
		SolSwapIntent {
			signer: self.signer,
			adapter: self.adapter,
			tokenIn: self.token_in,
			tokenOut: self.token_out,
			amountIn: self.amount_in,
			minAmountOut: self.min_amount_out,
			deadline: self.deadline,
			nonce: self.nonce,
			adapterData: self.adapter_data.clone(),
		}
	}
}

/// JSON form of a swap intent. Amounts are decimal strings, addresses and
/// bytes are `0x` hex.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapIntentWire {
	pub signer: String,
	pub adapter: String,
	pub token_in: String,
	pub token_out: String,
	pub amount_in: String,
	pub min_amount_out: String,
	pub deadline: String,
	pub nonce: String,
	pub adapter_data: String,
}

impl From<&SwapIntent> for SwapIntentWire {
	fn from(intent: &SwapIntent) -> Self {
		Self {
			signer: intent.signer.to_checksum(None),
			adapter: intent.adapter.to_checksum(None),
			token_in: intent.token_in.to_checksum(None),
			token_out: intent.token_out.to_checksum(None),
			amount_in: intent.amount_in.to_string(),
			min_amount_out: intent.min_amount_out.to_string(),
			deadline: intent.deadline.to_string(),
			nonce: intent.nonce.to_string(),
			adapter_data: format!("0x{}", hex::encode(&intent.adapter_data)),
		}
	}
}

impl TryFrom<&SwapIntentWire> for SwapIntent {
	type Error = IntentParseError;

	fn try_from(wire: &SwapIntentWire) -> Result<Self, Self::Error> {
		Ok(SwapIntent {
			signer: parse_address(&wire.signer).map_err(IntentParseError::field("signer"))?,
			adapter: parse_address(&wire.adapter).map_err(IntentParseError::field("adapter"))?,
			token_in: parse_address(&wire.token_in).map_err(IntentParseError::field("tokenIn"))?,
			token_out: parse_address(&wire.token_out)
				.map_err(IntentParseError::field("tokenOut"))?,
			amount_in: parse_u256(&wire.amount_in).map_err(IntentParseError::field("amountIn"))?,
			min_amount_out: parse_u256(&wire.min_amount_out)
				.map_err(IntentParseError::field("minAmountOut"))?,
			deadline: parse_u256(&wire.deadline).map_err(IntentParseError::field("deadline"))?,
			nonce: parse_u256(&wire.nonce).map_err(IntentParseError::field("nonce"))?,
			adapter_data: parse_hex_bytes(&wire.adapter_data)
				.map_err(IntentParseError::field("adapterData"))?,
		})
	}
}

/// Encodes the adapter parameters as `abi.encode(uint256 fee, uint256 deadline)`.
pub fn encode_adapter_data(fee: U256, deadline: U256) -> Bytes {
	let mut out = Vec::with_capacity(64);
	out.extend_from_slice(&fee.to_be_bytes::<32>());
	out.extend_from_slice(&deadline.to_be_bytes::<32>());
	Bytes::from(out)
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy_primitives::address;
	use alloy_sol_types::SolValue;

	fn sample_intent() -> SwapIntent {
		SwapIntent {
			signer: address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266"),
			adapter: address!("631B038B3Cf7Ac5f513dC74750345E48beceBCC0"),
			token_in: address!("833589fCD6eDb6E08f4c7C32D4f71b54bdA02913"),
			token_out: address!("4200000000000000000000000000000000000006"),
			amount_in: U256::from(1_000_000u64),
			min_amount_out: U256::from(1u64),
			deadline: U256::from(1_700_001_200u64),
			nonce: U256::from(123_456u64),
			adapter_data: encode_adapter_data(U256::from(3000u64), U256::from(1_700_001_200u64)),
		}
	}

	#[test]
	fn test_adapter_data_matches_abi_encode() {
		let fee = U256::from(3000u64);
		let deadline = U256::from(1_700_001_200u64);
		let encoded = encode_adapter_data(fee, deadline);

		assert_eq!(encoded.len(), 64);
		assert_eq!(encoded.to_vec(), (fee, deadline).abi_encode());
	}

	#[test]
	fn test_wire_output_is_checksummed_and_decimal() {
		let wire = SwapIntentWire::from(&sample_intent());

		assert_eq!(wire.signer, "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266");
		assert_eq!(wire.amount_in, "1000000");
		assert_eq!(wire.nonce, "123456");
		assert!(wire.adapter_data.starts_with("0x"));
		assert_eq!(wire.adapter_data.len(), 2 + 128);
	}

	#[test]
	fn test_wire_parses_back_to_same_intent() {
		let intent = sample_intent();
		let wire = SwapIntentWire::from(&intent);

		assert_eq!(SwapIntent::try_from(&wire).unwrap(), intent);
	}

	#[test]
	fn test_wire_json_uses_camel_case() {
		let json = serde_json::to_value(SwapIntentWire::from(&sample_intent())).unwrap();
		for key in [
			"signer",
			"adapter",
			"tokenIn",
			"tokenOut",
			"amountIn",
			"minAmountOut",
			"deadline",
			"nonce",
			"adapterData",
		] {
			assert!(json.get(key).is_some(), "missing {}", key);
		}
	}

	#[test]
	fn test_parse_reports_offending_field() {
		let mut wire = SwapIntentWire::from(&sample_intent());
		wire.token_out = "not-an-address".into();

		let err = SwapIntent::try_from(&wire).unwrap_err();
		match err {
			IntentParseError::InvalidField { field, .. } => assert_eq!(field, "tokenOut"),
		}

		let mut wire = SwapIntentWire::from(&sample_intent());
		wire.amount_in = "12abc".into();
		assert!(SwapIntent::try_from(&wire)
			.unwrap_err()
			.to_string()
			.starts_with("amountIn:"));
	}

	#[test]
	fn test_to_sol_preserves_fields() {
		let intent = sample_intent();
		let sol = intent.to_sol();

		assert_eq!(sol.signer, intent.signer);
		assert_eq!(sol.tokenOut, intent.token_out);
		assert_eq!(sol.minAmountOut, intent.min_amount_out);
		assert_eq!(sol.adapterData, intent.adapter_data);
	}
}
