//! Settlement contract bindings.
//!
//! The relayer talks to a single settlement contract that verifies an
//! EIP-712 signed swap intent and performs the swap through an adapter.
//! Only the four members the relayer needs are bound here.

use alloy_primitives::B256;
use alloy_sol_types::{sol, SolEvent};

use crate::delivery::ChainLog;

sol! {
	/// ABI tuple layout of a swap intent as accepted by `execute`.
	#[derive(Debug, PartialEq, Eq)]
	struct SolSwapIntent {
		address signer;
		address adapter;
		address tokenIn;
		address tokenOut;
		uint256 amountIn;
		uint256 minAmountOut;
		uint256 deadline;
		uint256 nonce;
		bytes adapterData;
	}

	#[derive(Debug, PartialEq, Eq)]
	interface IIntentSettlement {
		function SWAP_INTENT_TYPEHASH() external view returns (bytes32);

		function eip712Domain() external view returns (
			bytes1 fields,
			string name,
			string version,
			uint256 chainId,
			address verifyingContract,
			bytes32 salt,
			uint256[] extensions
		);

		function execute(SolSwapIntent calldata intent, bytes calldata signature)
			external
			returns (uint256 amountOut);

		event IntentExecuted(
			address indexed signer,
			address indexed adapter,
			address indexed tokenIn,
			address tokenOut,
			uint256 amountIn,
			uint256 amountOut,
			uint256 feePaid,
			uint256 nonce
		);
	}
}

pub use IIntentSettlement::IntentExecuted;

/// Topic0 of the `IntentExecuted` event.
pub const INTENT_EXECUTED_TOPIC: B256 = IntentExecuted::SIGNATURE_HASH;

/// Decodes an `IntentExecuted` event from a raw log.
///
/// Returns `None` when the log carries a different topic0 or does not decode
/// against the event ABI. Logs emitted by other contracts in the same
/// transaction are expected and silently skipped by callers.
pub fn decode_intent_executed(log: &ChainLog) -> Option<IntentExecuted> {
	if log.topics.first() != Some(&INTENT_EXECUTED_TOPIC) {
		return None;
	}
	IntentExecuted::decode_raw_log(log.topics.iter().copied(), &log.data).ok()
}
