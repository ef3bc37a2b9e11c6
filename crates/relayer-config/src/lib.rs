//! Configuration module for the intent relayer.
//!
//! Configuration is a single TOML file. Before parsing, `${VAR}` and
//! `${VAR:-default}` references are substituted from the process
//! environment so secrets such as the RPC URL and relay key never have to
//! live in the file itself. The same file drives both the HTTP relayer and
//! the event indexer; sections a binary does not use are ignored by it.

use alloy_primitives::{address, Address};
use regex::Regex;
use relayer_types::{parse_u256, without_0x_prefix};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error that occurs during file I/O operations.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	/// Error that occurs when parsing TOML configuration.
	#[error("Configuration error: {0}")]
	Parse(String),
	/// Error that occurs when configuration validation fails.
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		ConfigError::Parse(err.message().to_string())
	}
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	/// Relay identity and intent defaults.
	pub relayer: RelayerConfig,
	/// Chain RPC endpoint.
	pub rpc: RpcConfig,
	/// Relay signing key. Required by the relayer, unused by the indexer.
	#[serde(default)]
	pub account: Option<AccountConfig>,
	#[serde(default)]
	pub storage: StorageConfig,
	#[serde(default)]
	pub allowlist: AllowlistConfig,
	#[serde(default)]
	pub indexer: IndexerConfig,
	#[serde(default)]
	pub api: ApiConfig,
}

/// Relay identity and intent defaults.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RelayerConfig {
	/// Settlement contract intents are executed against.
	pub settlement: Address,
	/// The only chain id accepted by execute.
	#[serde(default = "default_chain_id")]
	pub chain_id: u64,
	/// Lifetime of a built intent; its deadline is now + this value.
	#[serde(default = "default_intent_ttl_seconds")]
	pub intent_ttl_seconds: u64,
	/// Adapter used when a build request does not name one.
	#[serde(default = "default_adapter")]
	pub default_adapter: Address,
	/// Pool fee tier packed into adapter data when a build request omits it.
	#[serde(default = "default_fee")]
	pub default_fee: u32,
	/// Decimal string.
	#[serde(default = "default_min_amount_out")]
	pub default_min_amount_out: String,
}

/// Chain RPC endpoint.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RpcConfig {
	pub url: String,
	/// Poll interval of the pending-transaction watcher.
	#[serde(default = "default_poll_interval_ms")]
	pub poll_interval_ms: u64,
	/// How long execute waits for a receipt before failing.
	#[serde(default = "default_receipt_timeout_seconds")]
	pub receipt_timeout_seconds: u64,
}

/// Relay signing key.
#[derive(Clone, Deserialize, Serialize)]
pub struct AccountConfig {
	/// Hex encoded secp256k1 private key, with or without 0x.
	pub private_key: String,
}

impl fmt::Debug for AccountConfig {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("AccountConfig")
			.field("private_key", &"[REDACTED]")
			.finish()
	}
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
	/// Nonce ledger JSON file.
	#[serde(default = "default_nonce_path")]
	pub nonce_path: PathBuf,
}

impl Default for StorageConfig {
	fn default() -> Self {
		Self {
			nonce_path: default_nonce_path(),
		}
	}
}

/// Adapter, token and pair allowlists.
///
/// Lists are comma separated so they can be injected through a single
/// environment variable. Pairs are directional `tokenIn>tokenOut`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AllowlistConfig {
	/// When set, every list must be non-empty before any intent is served.
	#[serde(default = "default_true")]
	pub strict: bool,
	#[serde(default)]
	pub adapters: String,
	#[serde(default)]
	pub tokens: String,
	#[serde(default)]
	pub pairs: String,
}

impl Default for AllowlistConfig {
	fn default() -> Self {
		Self {
			strict: true,
			adapters: String::new(),
			tokens: String::new(),
			pairs: String::new(),
		}
	}
}

/// Executed-event indexer settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IndexerConfig {
	/// First block to scan when no checkpoint exists.
	#[serde(default)]
	pub start_block: Option<u64>,
	/// Without a checkpoint or start block, scanning starts this many blocks below head.
	#[serde(default = "default_lookback_blocks")]
	pub lookback_blocks: u64,
	#[serde(default = "default_index_poll_interval_seconds")]
	pub poll_interval_seconds: u64,
	/// Blocks per `eth_getLogs` query.
	#[serde(default = "default_chunk_size")]
	pub chunk_size: u64,
	#[serde(default = "default_events_path")]
	pub events_path: PathBuf,
	#[serde(default = "default_checkpoint_path")]
	pub checkpoint_path: PathBuf,
}

impl Default for IndexerConfig {
	fn default() -> Self {
		Self {
			start_block: None,
			lookback_blocks: default_lookback_blocks(),
			poll_interval_seconds: default_index_poll_interval_seconds(),
			chunk_size: default_chunk_size(),
			events_path: default_events_path(),
			checkpoint_path: default_checkpoint_path(),
		}
	}
}

/// HTTP API server settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
	#[serde(default = "default_api_host")]
	pub host: String,
	#[serde(default = "default_api_port")]
	pub port: u16,
	/// Maximum request body size in bytes.
	#[serde(default = "default_max_request_size")]
	pub max_request_size: usize,
}

impl Default for ApiConfig {
	fn default() -> Self {
		Self {
			host: default_api_host(),
			port: default_api_port(),
			max_request_size: default_max_request_size(),
		}
	}
}

/// Base mainnet.
fn default_chain_id() -> u64 {
	8453
}

fn default_intent_ttl_seconds() -> u64 {
	1200
}

/// Uniswap V3 adapter deployed alongside the settlement on Base.
fn default_adapter() -> Address {
	address!("631B038B3Cf7Ac5f513dC74750345E48beceBCC0")
}

/// 0.3% pool.
fn default_fee() -> u32 {
	3000
}

fn default_min_amount_out() -> String {
	"1".to_string()
}

fn default_poll_interval_ms() -> u64 {
	7000
}

fn default_receipt_timeout_seconds() -> u64 {
	180
}

fn default_nonce_path() -> PathBuf {
	PathBuf::from("./data/nonces.json")
}

fn default_true() -> bool {
	true
}

fn default_lookback_blocks() -> u64 {
	50_000
}

fn default_index_poll_interval_seconds() -> u64 {
	10
}

/// Public RPC providers commonly cap log queries at a handful of blocks.
fn default_chunk_size() -> u64 {
	10
}

fn default_events_path() -> PathBuf {
	PathBuf::from("./data/intents.jsonl")
}

fn default_checkpoint_path() -> PathBuf {
	PathBuf::from("./data/index_state.json")
}

fn default_api_host() -> String {
	"127.0.0.1".to_string()
}

fn default_api_port() -> u16 {
	8787
}

fn default_max_request_size() -> usize {
	1024 * 1024
}

/// Largest value a uint24 fee tier can take.
const MAX_FEE: u32 = (1 << 24) - 1;

/// Resolves environment variables in a string.
///
/// Replaces ${VAR_NAME} with the value of the environment variable VAR_NAME.
/// Supports default values with ${VAR_NAME:-default_value}.
pub(crate) fn resolve_env_vars(input: &str) -> Result<String, ConfigError> {
	const MAX_INPUT_SIZE: usize = 1024 * 1024;
	if input.len() > MAX_INPUT_SIZE {
		return Err(ConfigError::Validation(format!(
			"Configuration file too large: {} bytes (max: {} bytes)",
			input.len(),
			MAX_INPUT_SIZE
		)));
	}

	let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]{0,127})(?::-([^}]{0,256}))?\}")
		.map_err(|e| ConfigError::Parse(format!("Regex error: {e}")))?;

	let mut result = input.to_string();
	let mut replacements = Vec::new();

	for cap in re.captures_iter(input) {
		let (Some(full_match), Some(var_name)) = (cap.get(0), cap.get(1)) else {
			continue;
		};
		let var_name = var_name.as_str();
		let default_value = cap.get(2).map(|m| m.as_str());

		let value = match std::env::var(var_name) {
			Ok(v) => v,
			Err(_) => match default_value {
				Some(default) => default.to_string(),
				None => {
					return Err(ConfigError::Validation(format!(
						"Environment variable '{var_name}' not found"
					)));
				},
			},
		};

		replacements.push((full_match.start(), full_match.end(), value));
	}

	for (start, end, value) in replacements.iter().rev() {
		result.replace_range(start..end, value);
	}

	Ok(result)
}

impl Config {
	/// Loads, resolves and validates a configuration file.
	pub async fn from_file(path: &str) -> Result<Self, ConfigError> {
		let content = tokio::fs::read_to_string(path).await?;
		content.parse()
	}

	/// Returns the account section, which only the relayer needs.
	pub fn require_account(&self) -> Result<&AccountConfig, ConfigError> {
		self.account.as_ref().ok_or_else(|| {
			ConfigError::Validation("[account] private_key is required by the relayer".into())
		})
	}

	fn validate(&self) -> Result<(), ConfigError> {
		if self.relayer.settlement == Address::ZERO {
			return Err(ConfigError::Validation(
				"relayer.settlement cannot be the zero address".into(),
			));
		}
		if self.relayer.intent_ttl_seconds == 0 {
			return Err(ConfigError::Validation(
				"relayer.intent_ttl_seconds must be greater than 0".into(),
			));
		}
		if self.relayer.default_fee > MAX_FEE {
			return Err(ConfigError::Validation(format!(
				"relayer.default_fee {} exceeds uint24",
				self.relayer.default_fee
			)));
		}
		parse_u256(&self.relayer.default_min_amount_out).map_err(|e| {
			ConfigError::Validation(format!("relayer.default_min_amount_out: {e}"))
		})?;

		if self.rpc.url.trim().is_empty() {
			return Err(ConfigError::Validation("rpc.url cannot be empty".into()));
		}
		if self.rpc.poll_interval_ms == 0 {
			return Err(ConfigError::Validation(
				"rpc.poll_interval_ms must be greater than 0".into(),
			));
		}
		if self.rpc.receipt_timeout_seconds == 0 {
			return Err(ConfigError::Validation(
				"rpc.receipt_timeout_seconds must be greater than 0".into(),
			));
		}

		if let Some(account) = &self.account {
			let key = without_0x_prefix(account.private_key.trim());
			if key.len() != 64 || !key.chars().all(|c| c.is_ascii_hexdigit()) {
				return Err(ConfigError::Validation(
					"account.private_key must be 32 bytes of hex".into(),
				));
			}
		}

		if self.indexer.chunk_size == 0 {
			return Err(ConfigError::Validation(
				"indexer.chunk_size must be greater than 0".into(),
			));
		}
		if self.indexer.poll_interval_seconds == 0 {
			return Err(ConfigError::Validation(
				"indexer.poll_interval_seconds must be greater than 0".into(),
			));
		}

		if self.api.port == 0 {
			return Err(ConfigError::Validation("api.port cannot be 0".into()));
		}

		Ok(())
	}
}

/// Parses a TOML string: env references are resolved first, then the
/// result is deserialized and validated.
impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let resolved = resolve_env_vars(s)?;
		let config: Config = toml::from_str(&resolved)?;
		config.validate()?;
		Ok(config)
	}
}
