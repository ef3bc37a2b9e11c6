//! Chain RPC boundary for the intent relayer.
//!
//! Everything the relayer and the indexer need from the chain goes through
//! [`ChainInterface`]: two read calls against the settlement, one write
//! call, receipt waiting, the head block number, and log queries. The
//! pipeline and indexer depend only on the trait, so tests drive them with
//! `MockChainInterface` (behind the `testing` feature).

use alloy_primitives::{Address, Bytes, B256};
use alloy_signer_local::PrivateKeySigner;
use async_trait::async_trait;
use relayer_types::{ChainLog, Eip712DomainFields, SwapIntent, TransactionReceipt};
use thiserror::Error;

pub mod implementations {
	pub mod evm {
		pub mod alloy;
	}
}

pub use implementations::evm::alloy::{AlloyChain, AlloyChainConfig};

/// Errors that can occur at the chain boundary.
#[derive(Debug, Error)]
pub enum DeliveryError {
	/// Transport or node failure.
	#[error("Network error: {0}")]
	Network(String),
	/// A call returned data that does not decode against the ABI.
	#[error("Decode error: {0}")]
	Decode(String),
	/// The node rejected or dropped a transaction.
	#[error("Transaction failed: {0}")]
	TransactionFailed(String),
	/// Invalid local setup: key, URL.
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// Chain operations used by the relayer.
#[async_trait]
#[cfg_attr(feature = "testing", mockall::automock)]
pub trait ChainInterface: Send + Sync {
	/// Reads `eip712Domain()` from `contract`.
	async fn read_domain(&self, contract: Address) -> Result<Eip712DomainFields, DeliveryError>;

	/// Reads `SWAP_INTENT_TYPEHASH()` from `contract`.
	async fn read_intent_type_hash(&self, contract: Address) -> Result<B256, DeliveryError>;

	/// Signs and broadcasts `execute(intent, signature)` from the relay account.
	async fn submit_execute(
		&self,
		contract: Address,
		intent: &SwapIntent,
		signature: &Bytes,
	) -> Result<B256, DeliveryError>;

	/// Blocks until `tx_hash` is mined or the configured timeout elapses.
	async fn wait_for_receipt(&self, tx_hash: B256) -> Result<TransactionReceipt, DeliveryError>;

	async fn current_block_number(&self) -> Result<u64, DeliveryError>;

	/// Logs emitted by `contract` with topic0 `event_signature` in the
	/// inclusive block range.
	async fn get_logs(
		&self,
		contract: Address,
		event_signature: B256,
		from_block: u64,
		to_block: u64,
	) -> Result<Vec<ChainLog>, DeliveryError>;
}

/// Parses a hex private key (with or without 0x) into a local signer.
pub fn parse_signer(private_key: &str) -> Result<PrivateKeySigner, DeliveryError> {
	private_key
		.trim()
		.parse::<PrivateKeySigner>()
		.map_err(|e| DeliveryError::Configuration(format!("Invalid private key: {}", e)))
}
