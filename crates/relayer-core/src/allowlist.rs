//! Adapter, token and pair allowlists.
//!
//! In strict mode all three lists must be non-empty, and
//! [`AllowlistPolicy::assert_configured`] must be called before
//! [`AllowlistPolicy::ensure_allowed`]: on its own, `ensure_allowed` treats
//! an empty list as "allow all" for that dimension.

use std::collections::HashSet;

use alloy_primitives::Address;
use relayer_config::AllowlistConfig;
use relayer_types::parse_address;
use thiserror::Error;
use tracing::warn;

/// Allowlist violations and misconfiguration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PolicyError {
	#[error("Relayer allowlists are not configured (STRICT_ALLOWLISTS=true). ALLOWED_ADAPTERS count={adapters} ALLOWED_TOKENS count={tokens} ALLOWED_PAIRS count={pairs} Set env vars ALLOWED_ADAPTERS, ALLOWED_TOKENS, ALLOWED_PAIRS (or set STRICT_ALLOWLISTS=false for dev).")]
	NotConfigured {
		adapters: usize,
		tokens: usize,
		pairs: usize,
	},
	#[error("adapter not allowed: {}", .0.to_checksum(None))]
	AdapterNotAllowed(Address),
	#[error("token not allowed: {} or {}", .token_in.to_checksum(None), .token_out.to_checksum(None))]
	TokenNotAllowed { token_in: Address, token_out: Address },
	#[error("pair not allowed: {}>{}", .token_in.to_checksum(None), .token_out.to_checksum(None))]
	PairNotAllowed { token_in: Address, token_out: Address },
}

/// Parses a comma separated address list. Entries that are not addresses
/// are skipped with a warning.
pub fn parse_address_list(csv: &str) -> HashSet<Address> {
	csv.split(',')
		.map(str::trim)
		.filter(|part| !part.is_empty())
		.filter_map(|part| match parse_address(part) {
			Ok(addr) => Some(addr),
			Err(_) => {
				warn!(entry = %part, "Skipping invalid allowlist address");
				None
			},
		})
		.collect()
}

/// Parses a comma separated list of `tokenIn>tokenOut` pairs.
pub fn parse_pair_list(csv: &str) -> HashSet<(Address, Address)> {
	csv.split(',')
		.map(str::trim)
		.filter(|part| !part.is_empty())
		.filter_map(|part| {
			let parsed = part.split_once('>').and_then(|(a, b)| {
				Some((parse_address(a.trim()).ok()?, parse_address(b.trim()).ok()?))
			});
			if parsed.is_none() {
				warn!(entry = %part, "Skipping invalid allowlist pair");
			}
			parsed
		})
		.collect()
}

#[derive(Debug, Clone, Default)]
pub struct AllowlistPolicy {
	strict: bool,
	adapters: HashSet<Address>,
	tokens: HashSet<Address>,
	pairs: HashSet<(Address, Address)>,
}

impl AllowlistPolicy {
	pub fn new(
		strict: bool,
		adapters: HashSet<Address>,
		tokens: HashSet<Address>,
		pairs: HashSet<(Address, Address)>,
	) -> Self {
		Self {
			strict,
			adapters,
			tokens,
			pairs,
		}
	}

	pub fn from_config(config: &AllowlistConfig) -> Self {
		Self::new(
			config.strict,
			parse_address_list(&config.adapters),
			parse_address_list(&config.tokens),
			parse_pair_list(&config.pairs),
		)
	}

	pub fn is_strict(&self) -> bool {
		self.strict
	}

	/// Sizes of the adapter, token and pair lists.
	pub fn counts(&self) -> (usize, usize, usize) {
		(self.adapters.len(), self.tokens.len(), self.pairs.len())
	}

	/// In strict mode, fails unless every list is non-empty. No-op otherwise.
	pub fn assert_configured(&self) -> Result<(), PolicyError> {
		if !self.strict {
			return Ok(());
		}
		if self.adapters.is_empty() || self.tokens.is_empty() || self.pairs.is_empty() {
			let (adapters, tokens, pairs) = self.counts();
			return Err(PolicyError::NotConfigured {
				adapters,
				tokens,
				pairs,
			});
		}
		Ok(())
	}

	/// Checks the adapter, both tokens, then the directional pair against
	/// every non-empty list.
	pub fn ensure_allowed(
		&self,
		adapter: Address,
		token_in: Address,
		token_out: Address,
	) -> Result<(), PolicyError> {
		if !self.adapters.is_empty() && !self.adapters.contains(&adapter) {
			return Err(PolicyError::AdapterNotAllowed(adapter));
		}
		if !self.tokens.is_empty()
			&& (!self.tokens.contains(&token_in) || !self.tokens.contains(&token_out))
		{
			return Err(PolicyError::TokenNotAllowed {
				token_in,
				token_out,
			});
		}
		if !self.pairs.is_empty() && !self.pairs.contains(&(token_in, token_out)) {
			return Err(PolicyError::PairNotAllowed {
				token_in,
				token_out,
			});
		}
		Ok(())
	}
}
