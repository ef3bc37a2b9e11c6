//! Relayer service library.
//!
//! Wires configuration, the chain client, the nonce ledger and the
//! allowlist policy into an [`IntentPipeline`](relayer_core::IntentPipeline)
//! and serves it over HTTP.

pub mod apis;
pub mod server;

use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use relayer_config::Config;
use relayer_core::{AllowlistPolicy, IntentPipeline, PipelineConfig};
use relayer_delivery::{parse_signer, AlloyChain, AlloyChainConfig};
use relayer_storage::FileNonceLedger;

pub use server::{router, start_server, AppState};

/// Builds the shared HTTP state from a loaded configuration.
///
/// Requires the `[account]` section. The nonce ledger reuses the intent TTL
/// as its reservation lifetime.
pub async fn build_state_from_config(config: &Config) -> Result<AppState, Box<dyn Error>> {
	let account = config.require_account()?;
	let signer = parse_signer(&account.private_key)?;

	let chain = AlloyChain::new(
		&AlloyChainConfig {
			rpc_url: config.rpc.url.clone(),
			chain_id: config.relayer.chain_id,
			poll_interval: Duration::from_millis(config.rpc.poll_interval_ms),
			receipt_timeout: Duration::from_secs(config.rpc.receipt_timeout_seconds),
		},
		signer,
	)?;
	let relayer = chain
		.sender()
		.ok_or("relay account address unavailable")?;

	let ledger = FileNonceLedger::open(
		config.storage.nonce_path.clone(),
		Duration::from_secs(config.relayer.intent_ttl_seconds),
	)
	.await?;

	let policy = AllowlistPolicy::from_config(&config.allowlist);
	let (adapters, tokens, pairs) = policy.counts();
	tracing::info!(
		strict = policy.is_strict(),
		adapters,
		tokens,
		pairs,
		"Loaded allowlists"
	);
	if let Err(e) = policy.assert_configured() {
		tracing::warn!("{}", e);
	}

	let pipeline = IntentPipeline::new(
		PipelineConfig::from_config(config)?,
		policy,
		Arc::new(ledger),
		Arc::new(chain),
	);

	Ok(AppState {
		pipeline: Arc::new(pipeline),
		relayer,
		settlement: config.relayer.settlement,
		chain_id: config.relayer.chain_id,
	})
}
