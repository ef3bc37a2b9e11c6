//! Build and execute flows.
//!
//! `build` hands a signer an unsigned intent carrying a freshly reserved
//! nonce. `execute` verifies a signed intent against the settlement's own
//! EIP-712 domain, relays it, and marks the nonce used once the transaction
//! succeeds. Both flows start with the strict allowlist check, so a
//! misconfigured relayer rejects requests before touching the ledger or
//! the chain.

use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::{Address, B256, U256};
use relayer_config::{Config, ConfigError};
use relayer_delivery::ChainInterface;
use relayer_storage::{NonceLedgerInterface, StorageError};
use relayer_types::{
	current_timestamp, decode_intent_executed, encode_adapter_data, parse_address, parse_hex_bytes,
	parse_u256,
	utils::{compute_intent_digest, recover_signer},
	APIError, ApiErrorType, BuildIntentRequest, ExecuteRequest, ExecuteResponse, ExecutionStatus,
	IntentExecuted, IntentExecutedPayload, SwapIntent, TransactionReceipt,
};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::allowlist::{AllowlistPolicy, PolicyError};

/// Candidate nonces are drawn from `[1, NONCE_UPPER_BOUND)`.
pub const NONCE_UPPER_BOUND: u64 = 1_000_000_000;

/// Attempts at finding an unknown nonce before giving up.
pub const NONCE_ATTEMPTS: usize = 20;

const MAX_UINT24: u32 = 0x00ff_ffff;

/// Source of candidate nonces.
pub type NonceGenerator = Box<dyn Fn() -> U256 + Send + Sync>;

/// Errors produced by the build and execute flows.
#[derive(Debug, Error)]
pub enum PipelineError {
	#[error(transparent)]
	Policy(#[from] PolicyError),
	#[error("Invalid address in request")]
	InvalidAddress,
	#[error("{0}")]
	InvalidRequest(String),
	#[error("Unsupported chainId")]
	UnsupportedChain(u64),
	#[error("Intent expired (deadline < now)")]
	Expired { deadline: U256, now: u64 },
	#[error("Nonce already used")]
	NonceUsed,
	#[error("Failed to generate unique nonce (try again)")]
	NonceExhausted,
	#[error("Failed to read eip712Domain() from settlement")]
	DomainRead(String),
	#[error("Failed to read SWAP_INTENT_TYPEHASH() from settlement")]
	TypeHashRead(String),
	#[error("Signature recover failed")]
	SignatureRecover(String),
	#[error("Invalid signature (recovered != intent.signer)")]
	SignerMismatch { recovered: Address, expected: Address },
	#[error("writeContract failed")]
	Submit(String),
	#[error("waitForTransactionReceipt failed")]
	Receipt(String),
	#[error("Nonce store failure")]
	Storage(String),
}

impl From<StorageError> for PipelineError {
	fn from(err: StorageError) -> Self {
		PipelineError::Storage(err.to_string())
	}
}

impl From<PipelineError> for APIError {
	fn from(err: PipelineError) -> Self {
		let message = err.to_string();
		match err {
			PipelineError::Policy(PolicyError::NotConfigured { .. }) => {
				APIError::bad_request(ApiErrorType::Configuration, message)
			},
			PipelineError::Policy(_) | PipelineError::NonceUsed | PipelineError::NonceExhausted => {
				APIError::bad_request(ApiErrorType::Policy, message)
			},
			PipelineError::InvalidAddress
			| PipelineError::InvalidRequest(_)
			| PipelineError::UnsupportedChain(_)
			| PipelineError::Expired { .. } => APIError::bad_request(ApiErrorType::Validation, message),
			PipelineError::SignatureRecover(detail) => APIError::BadRequest {
				error_type: ApiErrorType::Signature,
				message,
				detail: Some(detail),
				fields: serde_json::Map::new(),
			},
			PipelineError::SignerMismatch {
				recovered,
				expected,
			} => {
				let mut fields = serde_json::Map::new();
				fields.insert("recovered".into(), recovered.to_checksum(None).into());
				fields.insert("expected".into(), expected.to_checksum(None).into());
				APIError::BadRequest {
					error_type: ApiErrorType::Signature,
					message,
					detail: None,
					fields,
				}
			},
			PipelineError::DomainRead(detail)
			| PipelineError::TypeHashRead(detail)
			| PipelineError::Submit(detail)
			| PipelineError::Receipt(detail) => {
				APIError::internal(ApiErrorType::ChainRpc, message, Some(detail))
			},
			PipelineError::Storage(detail) => {
				APIError::internal(ApiErrorType::Storage, message, Some(detail))
			},
		}
	}
}

/// Settlement coordinates and request defaults.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
	pub settlement: Address,
	pub chain_id: u64,
	pub intent_ttl: Duration,
	pub default_adapter: Address,
	pub default_fee: u32,
	pub default_min_amount_out: U256,
}

impl PipelineConfig {
	pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
		let relayer = &config.relayer;
		let default_min_amount_out = parse_u256(&relayer.default_min_amount_out)
			.map_err(|e| ConfigError::Validation(format!("relayer.default_min_amount_out: {e}")))?;
		Ok(Self {
			settlement: relayer.settlement,
			chain_id: relayer.chain_id,
			intent_ttl: Duration::from_secs(relayer.intent_ttl_seconds),
			default_adapter: relayer.default_adapter,
			default_fee: relayer.default_fee,
			default_min_amount_out,
		})
	}
}

/// Result of a relayed execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionOutcome {
	pub tx_hash: B256,
	pub success: bool,
	pub block_number: u64,
	pub intent_executed: Option<IntentExecuted>,
}

impl ExecutionOutcome {
	pub fn to_response(&self) -> ExecuteResponse {
		ExecuteResponse {
			tx_hash: self.tx_hash.to_string(),
			status: if self.success {
				ExecutionStatus::Success
			} else {
				ExecutionStatus::Reverted
			},
			block_number: self.block_number.to_string(),
			intent_executed: self.intent_executed.as_ref().map(IntentExecutedPayload::from),
		}
	}
}

/// Uniform draw from `[1, NONCE_UPPER_BOUND)` using the v4 UUID's random bits.
pub fn random_nonce() -> U256 {
	let raw = uuid::Uuid::new_v4().as_u128();
	U256::from(raw % u128::from(NONCE_UPPER_BOUND - 1) + 1)
}

/// The relayer's request flows over a chain client, a nonce ledger and an
/// allowlist policy.
pub struct IntentPipeline {
	config: PipelineConfig,
	policy: AllowlistPolicy,
	ledger: Arc<dyn NonceLedgerInterface>,
	chain: Arc<dyn ChainInterface>,
	nonce_generator: NonceGenerator,
}

impl IntentPipeline {
	pub fn new(
		config: PipelineConfig,
		policy: AllowlistPolicy,
		ledger: Arc<dyn NonceLedgerInterface>,
		chain: Arc<dyn ChainInterface>,
	) -> Self {
		Self {
			config,
			policy,
			ledger,
			chain,
			nonce_generator: Box::new(random_nonce),
		}
	}

	/// Replaces the nonce source.
	pub fn with_nonce_generator(mut self, generator: NonceGenerator) -> Self {
		self.nonce_generator = generator;
		self
	}

	pub fn config(&self) -> &PipelineConfig {
		&self.config
	}

	pub fn policy(&self) -> &AllowlistPolicy {
		&self.policy
	}

	/// Assembles an unsigned intent for the caller to sign and reserves its
	/// nonce.
	pub async fn build(&self, request: &BuildIntentRequest) -> Result<SwapIntent, PipelineError> {
		self.policy.assert_configured()?;

		let (signer, token_in, token_out) = match (
			parse_address(&request.signer),
			parse_address(&request.token_in),
			parse_address(&request.token_out),
		) {
			(Ok(signer), Ok(token_in), Ok(token_out)) => (signer, token_in, token_out),
			_ => return Err(PipelineError::InvalidAddress),
		};

		let amount_in = parse_u256(&request.amount_in)
			.map_err(|e| PipelineError::InvalidRequest(format!("amountIn: {e}")))?;
		let min_amount_out = match &request.min_amount_out {
			Some(value) => parse_u256(value)
				.map_err(|e| PipelineError::InvalidRequest(format!("minAmountOut: {e}")))?,
			None => self.config.default_min_amount_out,
		};
		let fee = request.fee.unwrap_or(self.config.default_fee);
		if fee > MAX_UINT24 {
			return Err(PipelineError::InvalidRequest(format!(
				"fee: {fee} exceeds uint24"
			)));
		}
		let adapter = match &request.adapter {
			Some(value) => {
				parse_address(value).map_err(|e| PipelineError::InvalidRequest(format!("adapter: {e}")))?
			},
			None => self.config.default_adapter,
		};

		self.policy.ensure_allowed(adapter, token_in, token_out)?;

		let deadline = U256::from(current_timestamp() + self.config.intent_ttl.as_secs());
		let nonce = self.reserve_fresh_nonce(signer).await?;

		info!(
			signer = %signer,
			nonce = %nonce,
			deadline = %deadline,
			"Built intent"
		);

		Ok(SwapIntent {
			signer,
			adapter,
			token_in,
			token_out,
			amount_in,
			min_amount_out,
			deadline,
			nonce,
			adapter_data: encode_adapter_data(U256::from(fee), deadline),
		})
	}

	/// Draws candidates until one can be reserved. The unknown check and the
	/// reservation happen in one ledger call.
	async fn reserve_fresh_nonce(&self, signer: Address) -> Result<U256, PipelineError> {
		for attempt in 1..=NONCE_ATTEMPTS {
			let candidate = (self.nonce_generator)();
			if self.ledger.reserve_if_unknown(signer, candidate).await? {
				return Ok(candidate);
			}
			debug!(signer = %signer, nonce = %candidate, attempt, "Nonce candidate already known");
		}
		warn!(signer = %signer, attempts = NONCE_ATTEMPTS, "Could not find an unused nonce");
		Err(PipelineError::NonceExhausted)
	}

	/// Verifies a signed intent, relays it and waits for the receipt.
	pub async fn execute(&self, request: &ExecuteRequest) -> Result<ExecutionOutcome, PipelineError> {
		self.policy.assert_configured()?;

		let intent = SwapIntent::try_from(&request.intent)
			.map_err(|e| PipelineError::InvalidRequest(e.to_string()))?;
		let signature = parse_hex_bytes(&request.signature)
			.map_err(|e| PipelineError::InvalidRequest(format!("signature: {e}")))?;

		if request.chain_id != self.config.chain_id {
			return Err(PipelineError::UnsupportedChain(request.chain_id));
		}

		let now = current_timestamp();
		if intent.deadline < U256::from(now) {
			return Err(PipelineError::Expired {
				deadline: intent.deadline,
				now,
			});
		}

		self.policy
			.ensure_allowed(intent.adapter, intent.token_in, intent.token_out)?;

		if self.ledger.is_used(intent.signer, intent.nonce).await? {
			return Err(PipelineError::NonceUsed);
		}

		let settlement = self.config.settlement;
		let domain = self
			.chain
			.read_domain(settlement)
			.await
			.map_err(|e| PipelineError::DomainRead(e.to_string()))?;
		let type_hash = self
			.chain
			.read_intent_type_hash(settlement)
			.await
			.map_err(|e| PipelineError::TypeHashRead(e.to_string()))?;

		let digest = compute_intent_digest(&domain, &type_hash, &intent);
		let recovered = recover_signer(&digest, &signature)
			.map_err(|e| PipelineError::SignatureRecover(e.to_string()))?;
		if recovered != intent.signer {
			warn!(
				recovered = %recovered,
				expected = %intent.signer,
				"Signature does not match intent signer"
			);
			return Err(PipelineError::SignerMismatch {
				recovered,
				expected: intent.signer,
			});
		}

		let tx_hash = self
			.chain
			.submit_execute(settlement, &intent, &signature)
			.await
			.map_err(|e| PipelineError::Submit(e.to_string()))?;
		info!(
			tx_hash = %tx_hash,
			signer = %intent.signer,
			nonce = %intent.nonce,
			"Submitted execute"
		);

		let receipt = self
			.chain
			.wait_for_receipt(tx_hash)
			.await
			.map_err(|e| PipelineError::Receipt(e.to_string()))?;

		let intent_executed = find_intent_executed(&receipt, settlement);

		if receipt.success {
			info!(
				tx_hash = %tx_hash,
				block_number = receipt.block_number,
				"Intent executed"
			);
			// The swap already happened on chain; a ledger write failure must
			// not turn it into an error response.
			if let Err(e) = self.ledger.mark_used(intent.signer, intent.nonce).await {
				error!(
					signer = %intent.signer,
					nonce = %intent.nonce,
					error = %e,
					"Failed to mark nonce used"
				);
			}
		} else {
			warn!(
				tx_hash = %tx_hash,
				block_number = receipt.block_number,
				"Execute transaction reverted"
			);
		}

		Ok(ExecutionOutcome {
			tx_hash,
			success: receipt.success,
			block_number: receipt.block_number,
			intent_executed,
		})
	}
}

/// First `IntentExecuted` emitted by `settlement` in the receipt.
fn find_intent_executed(receipt: &TransactionReceipt, settlement: Address) -> Option<IntentExecuted> {
	receipt
		.logs
		.iter()
		.filter(|log| log.address == settlement)
		.find_map(decode_intent_executed)
}
