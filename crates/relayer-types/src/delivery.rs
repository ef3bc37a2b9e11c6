//! Chain-facing types shared between the delivery layer and its callers.
//!
//! These keep the pipeline and indexer independent of the concrete RPC
//! client: the delivery implementation converts provider responses into
//! these plain structures.

use alloy_primitives::{Address, Bytes, FixedBytes, B256, U256};

/// A raw event log as observed on chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainLog {
	/// Contract that emitted the log.
	pub address: Address,
	/// Indexed topics, topic0 being the event signature hash.
	pub topics: Vec<B256>,
	/// ABI encoded non-indexed data.
	pub data: Bytes,
	/// Block containing the log, absent for pending logs.
	pub block_number: Option<u64>,
	/// Transaction that emitted the log.
	pub transaction_hash: Option<B256>,
	/// Position of the log within its block.
	pub log_index: Option<u64>,
}

/// Outcome of a mined transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionReceipt {
	pub hash: B256,
	pub block_number: u64,
	/// Whether execution succeeded (status == 1).
	pub success: bool,
	pub logs: Vec<ChainLog>,
}

/// Fields returned by the settlement's ERC-5267 `eip712Domain()` getter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Eip712DomainFields {
	/// Bitmask describing which domain fields are in use.
	pub fields: FixedBytes<1>,
	pub name: String,
	pub version: String,
	pub chain_id: U256,
	pub verifying_contract: Address,
	pub salt: B256,
}

impl Eip712DomainFields {
	/// Bit of the `fields` mask announcing a salt.
	pub const SALT_FLAG: u8 = 0x10;

	/// Whether the domain separator must include the salt.
	///
	/// A salt counts as present when the mask announces it or when the
	/// contract returns a non-zero salt regardless of the mask.
	pub fn has_salt(&self) -> bool {
		self.fields[0] & Self::SALT_FLAG != 0 || self.salt != B256::ZERO
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn domain(fields: u8, salt: B256) -> Eip712DomainFields {
		Eip712DomainFields {
			fields: FixedBytes([fields]),
			name: "IntentSettlement".into(),
			version: "1".into(),
			chain_id: U256::from(8453u64),
			verifying_contract: Address::repeat_byte(0x11),
			salt,
		}
	}

	#[test]
	fn test_has_salt() {
		assert!(!domain(0x0f, B256::ZERO).has_salt());
		assert!(domain(0x1f, B256::ZERO).has_salt());
		assert!(domain(0x0f, B256::repeat_byte(0x01)).has_salt());
	}
}
