//! Alloy-based implementation of [`ChainInterface`].
//!
//! One HTTP provider with a retry/backoff layer. With a signer the provider
//! also carries a wallet and nonce/gas/chain-id fillers so `execute` can be
//! sent as a plain transaction request; the indexer uses a read-only
//! provider without a wallet.

use std::time::Duration;

use alloy_network::EthereumWallet;
use alloy_primitives::{Address, Bytes, B256};
use alloy_provider::{
	fillers::{ChainIdFiller, GasFiller, NonceFiller, SimpleNonceManager},
	DynProvider, PendingTransactionConfig, PendingTransactionError, Provider, ProviderBuilder,
};
use alloy_rpc_client::RpcClient;
use alloy_rpc_types::{Filter, Log, TransactionRequest};
use alloy_signer::Signer;
use alloy_signer_local::PrivateKeySigner;
use alloy_sol_types::SolCall;
use alloy_transport::layers::RetryBackoffLayer;
use async_trait::async_trait;
use relayer_types::{
	redact_rpc_url, ChainLog, Eip712DomainFields, IIntentSettlement, SwapIntent,
	TransactionReceipt,
};

use crate::{ChainInterface, DeliveryError};

/// Connection settings for [`AlloyChain`].
#[derive(Debug, Clone)]
pub struct AlloyChainConfig {
	pub rpc_url: String,
	pub chain_id: u64,
	/// Poll interval of the pending-transaction watcher.
	pub poll_interval: Duration,
	/// How long [`ChainInterface::wait_for_receipt`] waits before giving up.
	pub receipt_timeout: Duration,
}

/// Alloy-backed chain client.
pub struct AlloyChain {
	provider: DynProvider,
	chain_id: u64,
	receipt_timeout: Duration,
	sender: Option<Address>,
}

impl AlloyChain {
	/// Creates a client that can sign and send transactions as `signer`.
	pub fn new(config: &AlloyChainConfig, signer: PrivateKeySigner) -> Result<Self, DeliveryError> {
		let sender = signer.address();
		let wallet = EthereumWallet::from(signer.with_chain_id(Some(config.chain_id)));

		let provider = ProviderBuilder::new()
			.filler(NonceFiller::new(SimpleNonceManager::default()))
			.filler(GasFiller)
			.filler(ChainIdFiller::default())
			.wallet(wallet)
			.connect_client(Self::client(config)?);

		provider.client().set_poll_interval(config.poll_interval);

		tracing::debug!(
			rpc_url = %redact_rpc_url(&config.rpc_url),
			chain_id = config.chain_id,
			sender = %sender,
			"Alloy chain client configured"
		);

		Ok(Self {
			provider: provider.erased(),
			chain_id: config.chain_id,
			receipt_timeout: config.receipt_timeout,
			sender: Some(sender),
		})
	}

	/// Creates a client for reads and log queries only.
	pub fn read_only(config: &AlloyChainConfig) -> Result<Self, DeliveryError> {
		let provider = ProviderBuilder::new().connect_client(Self::client(config)?);
		provider.client().set_poll_interval(config.poll_interval);

		Ok(Self {
			provider: provider.erased(),
			chain_id: config.chain_id,
			receipt_timeout: config.receipt_timeout,
			sender: None,
		})
	}

	fn client(config: &AlloyChainConfig) -> Result<RpcClient, DeliveryError> {
		let url = config.rpc_url.parse().map_err(|e| {
			DeliveryError::Configuration(format!(
				"Invalid RPC URL {}: {}",
				redact_rpc_url(&config.rpc_url),
				e
			))
		})?;

		let retry_layer = RetryBackoffLayer::new(
			5,    // max_retry
			1000, // initial backoff in milliseconds
			10,   // compute units per second
		);

		Ok(RpcClient::builder().layer(retry_layer).http(url))
	}

	/// Address transactions are sent from, if this client can sign.
	pub fn sender(&self) -> Option<Address> {
		self.sender
	}

	async fn eth_call(&self, to: Address, data: Vec<u8>) -> Result<Bytes, DeliveryError> {
		let request = TransactionRequest::default().to(to).input(data.into());
		self.provider
			.call(request)
			.await
			.map_err(|e| DeliveryError::Network(format!("eth_call failed: {}", e)))
	}
}

/// Converts an RPC log into the relayer's log type.
pub(crate) fn chain_log_from_rpc(log: &Log) -> ChainLog {
	ChainLog {
		address: log.address(),
		topics: log.topics().to_vec(),
		data: log.data().data.clone(),
		block_number: log.block_number,
		transaction_hash: log.transaction_hash,
		log_index: log.log_index,
	}
}

pub(crate) fn domain_from_return(
	ret: IIntentSettlement::eip712DomainReturn,
) -> Eip712DomainFields {
	Eip712DomainFields {
		fields: ret.fields,
		name: ret.name,
		version: ret.version,
		chain_id: ret.chainId,
		verifying_contract: ret.verifyingContract,
		salt: ret.salt,
	}
}

#[async_trait]
impl ChainInterface for AlloyChain {
	async fn read_domain(&self, contract: Address) -> Result<Eip712DomainFields, DeliveryError> {
		let data = IIntentSettlement::eip712DomainCall {}.abi_encode();
		let result = self.eth_call(contract, data).await?;

		let decoded = IIntentSettlement::eip712DomainCall::abi_decode_returns(&result)
			.map_err(|e| DeliveryError::Decode(format!("eip712Domain(): {}", e)))?;

		Ok(domain_from_return(decoded))
	}

	async fn read_intent_type_hash(&self, contract: Address) -> Result<B256, DeliveryError> {
		let data = IIntentSettlement::SWAP_INTENT_TYPEHASHCall {}.abi_encode();
		let result = self.eth_call(contract, data).await?;

		IIntentSettlement::SWAP_INTENT_TYPEHASHCall::abi_decode_returns(&result)
			.map_err(|e| DeliveryError::Decode(format!("SWAP_INTENT_TYPEHASH(): {}", e)))
	}

	async fn submit_execute(
		&self,
		contract: Address,
		intent: &SwapIntent,
		signature: &Bytes,
	) -> Result<B256, DeliveryError> {
		let sender = self.sender.ok_or_else(|| {
			DeliveryError::Configuration("Read-only client cannot submit transactions".into())
		})?;

		let call = IIntentSettlement::executeCall {
			intent: intent.to_sol(),
			signature: signature.clone(),
		};
		let request = TransactionRequest::default()
			.from(sender)
			.to(contract)
			.input(call.abi_encode().into());

		tracing::debug!(
			chain_id = self.chain_id,
			to = %contract,
			signer = %intent.signer,
			nonce = %intent.nonce,
			"Sending execute transaction"
		);

		let pending_tx = self.provider.send_transaction(request).await.map_err(|e| {
			tracing::error!(chain_id = self.chain_id, error = %e, "Execute submission failed");
			DeliveryError::TransactionFailed(format!("Failed to send transaction: {}", e))
		})?;

		let tx_hash = *pending_tx.tx_hash();
		tracing::info!(tx_hash = %tx_hash, chain_id = self.chain_id, "Execute transaction sent");
		Ok(tx_hash)
	}

	async fn wait_for_receipt(&self, tx_hash: B256) -> Result<TransactionReceipt, DeliveryError> {
		let config = PendingTransactionConfig::new(tx_hash)
			.with_required_confirmations(1)
			.with_timeout(Some(self.receipt_timeout));

		let pending_tx = self
			.provider
			.watch_pending_transaction(config)
			.await
			.map_err(|e| match e {
				PendingTransactionError::FailedToRegister => {
					DeliveryError::Network("Failed to register transaction watcher".to_string())
				},
				other => DeliveryError::Network(format!("Transaction watch failed: {}", other)),
			})?;

		let confirmed_hash = pending_tx
			.await
			.map_err(|e| DeliveryError::Network(format!("Failed to confirm transaction: {}", e)))?;

		let receipt = self
			.provider
			.get_transaction_receipt(confirmed_hash)
			.await
			.map_err(|e| DeliveryError::Network(format!("Failed to get receipt: {}", e)))?
			.ok_or_else(|| {
				DeliveryError::Network(format!("Receipt for {} not found", confirmed_hash))
			})?;

		Ok(TransactionReceipt {
			hash: receipt.transaction_hash,
			block_number: receipt.block_number.unwrap_or(0),
			success: receipt.status(),
			logs: receipt.inner.logs().iter().map(chain_log_from_rpc).collect(),
		})
	}

	async fn current_block_number(&self) -> Result<u64, DeliveryError> {
		self.provider
			.get_block_number()
			.await
			.map_err(|e| DeliveryError::Network(format!("Failed to get block number: {}", e)))
	}

	async fn get_logs(
		&self,
		contract: Address,
		event_signature: B256,
		from_block: u64,
		to_block: u64,
	) -> Result<Vec<ChainLog>, DeliveryError> {
		let filter = Filter::new()
			.address(contract)
			.event_signature(event_signature)
			.from_block(from_block)
			.to_block(to_block);

		let logs = self.provider.get_logs(&filter).await.map_err(|e| {
			DeliveryError::Network(format!(
				"Failed to get logs for blocks {}..={}: {}",
				from_block, to_block, e
			))
		})?;

		Ok(logs.iter().map(chain_log_from_rpc).collect())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy_primitives::{FixedBytes, LogData, U256};

	fn config() -> AlloyChainConfig {
		AlloyChainConfig {
			rpc_url: "http://127.0.0.1:8545".into(),
			chain_id: 8453,
			poll_interval: Duration::from_millis(100),
			receipt_timeout: Duration::from_secs(5),
		}
	}

	#[test]
	fn test_chain_log_from_rpc() {
		let topics = vec![B256::repeat_byte(0x01), B256::repeat_byte(0x02)];
		let log = Log {
			inner: alloy_primitives::Log {
				address: Address::repeat_byte(0x11),
				data: LogData::new_unchecked(topics.clone(), Bytes::from(vec![1u8, 2, 3])),
			},
			block_hash: Some(B256::repeat_byte(0x0a)),
			block_number: Some(100),
			block_timestamp: None,
			transaction_hash: Some(B256::repeat_byte(0x0b)),
			transaction_index: Some(0),
			log_index: Some(4),
			removed: false,
		};

		let converted = chain_log_from_rpc(&log);

		assert_eq!(converted.address, Address::repeat_byte(0x11));
		assert_eq!(converted.topics, topics);
		assert_eq!(converted.data.as_ref(), &[1u8, 2, 3]);
		assert_eq!(converted.block_number, Some(100));
		assert_eq!(converted.transaction_hash, Some(B256::repeat_byte(0x0b)));
		assert_eq!(converted.log_index, Some(4));
	}

	#[test]
	fn test_domain_from_return() {
		let ret = IIntentSettlement::eip712DomainReturn {
			fields: FixedBytes([0x0f]),
			name: "IntentSettlement".into(),
			version: "1".into(),
			chainId: U256::from(8453u64),
			verifyingContract: Address::repeat_byte(0x22),
			salt: B256::ZERO,
			extensions: vec![],
		};

		let domain = domain_from_return(ret);

		assert_eq!(domain.name, "IntentSettlement");
		assert_eq!(domain.chain_id, U256::from(8453u64));
		assert_eq!(domain.verifying_contract, Address::repeat_byte(0x22));
		assert!(!domain.has_salt());
	}

	#[test]
	fn test_domain_return_decodes_from_abi() {
		let ret = IIntentSettlement::eip712DomainReturn {
			fields: FixedBytes([0x1f]),
			name: "IntentSettlement".into(),
			version: "2".into(),
			chainId: U256::from(8453u64),
			verifyingContract: Address::repeat_byte(0x22),
			salt: B256::repeat_byte(0x33),
			extensions: vec![U256::from(1u64)],
		};
		let encoded = IIntentSettlement::eip712DomainCall::abi_encode_returns(&ret);

		let decoded = IIntentSettlement::eip712DomainCall::abi_decode_returns(&encoded).unwrap();
		let domain = domain_from_return(decoded);

		assert_eq!(domain.version, "2");
		assert_eq!(domain.salt, B256::repeat_byte(0x33));
		assert!(domain.has_salt());
	}

	#[tokio::test]
	async fn test_new_records_sender() {
		let signer = PrivateKeySigner::random();
		let expected = signer.address();

		let chain = AlloyChain::new(&config(), signer).unwrap();

		assert_eq!(chain.sender(), Some(expected));
	}

	#[tokio::test]
	async fn test_read_only_cannot_submit() {
		let chain = AlloyChain::read_only(&config()).unwrap();
		assert!(chain.sender().is_none());

		let intent = SwapIntent {
			signer: Address::repeat_byte(0x01),
			adapter: Address::repeat_byte(0x02),
			token_in: Address::repeat_byte(0x03),
			token_out: Address::repeat_byte(0x04),
			amount_in: U256::from(1u64),
			min_amount_out: U256::from(1u64),
			deadline: U256::from(1u64),
			nonce: U256::from(1u64),
			adapter_data: Bytes::new(),
		};
		let err = chain
			.submit_execute(Address::repeat_byte(0x05), &intent, &Bytes::new())
			.await
			.unwrap_err();
		assert!(matches!(err, DeliveryError::Configuration(_)));
	}

	#[test]
	fn test_invalid_url_is_configuration_error() {
		let mut cfg = config();
		cfg.rpc_url = "not a url".into();
		assert!(matches!(
			AlloyChain::read_only(&cfg),
			Err(DeliveryError::Configuration(_))
		));
	}
}
