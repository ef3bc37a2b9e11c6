//! Nonce ledger: per-signer record of nonces handed out and consumed.
//!
//! A nonce is `reserved` when the build endpoint hands it to a signer and
//! `used` once an execution carrying it succeeds on chain. Used entries are
//! replay protection and are never collected; reserved entries older than
//! the ledger TTL are dropped by garbage collection, which runs at the start
//! of every operation.

use std::collections::BTreeMap;
use std::time::Duration;

use alloy_primitives::{Address, U256};
use async_trait::async_trait;
use relayer_types::{parse_address, NonceEntry, NonceStatus};
use tracing::warn;

use crate::StorageError;

/// Shortest TTL a ledger accepts; smaller values are raised to this.
pub const MIN_NONCE_TTL: Duration = Duration::from_secs(60);

/// Operations every nonce ledger backend provides.
///
/// Each call holds the backend's lock for its whole duration, so a single
/// call is atomic with respect to every other call on the same ledger.
#[async_trait]
#[cfg_attr(feature = "testing", mockall::automock)]
pub trait NonceLedgerInterface: Send + Sync {
	/// Whether the nonce has been consumed on chain.
	async fn is_used(&self, signer: Address, nonce: U256) -> Result<bool, StorageError>;

	/// Whether the nonce is reserved or used.
	async fn is_known(&self, signer: Address, nonce: U256) -> Result<bool, StorageError>;

	/// Creates a reserved entry unless one (of either status) exists.
	async fn reserve(&self, signer: Address, nonce: U256) -> Result<(), StorageError>;

	/// Overwrites any entry with `used` and a fresh timestamp.
	async fn mark_used(&self, signer: Address, nonce: U256) -> Result<(), StorageError>;

	/// Reserves the nonce only if it is unknown, as one critical section.
	///
	/// Returns `true` when this call created the reservation. Two concurrent
	/// callers racing on the same (signer, nonce) never both see `true`.
	async fn reserve_if_unknown(&self, signer: Address, nonce: U256)
		-> Result<bool, StorageError>;

	/// Current entry, if any.
	async fn entry(&self, signer: Address, nonce: U256)
		-> Result<Option<NonceEntry>, StorageError>;
}

/// In-memory ledger contents, shared by the backends.
///
/// Serialized as `{ "<checksummed signer>": { "<decimal nonce>": { "status", "ts" } } }`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerState {
	entries: BTreeMap<String, BTreeMap<String, NonceEntry>>,
}

fn signer_key(signer: &Address) -> String {
	signer.to_checksum(None)
}

fn nonce_key(nonce: &U256) -> String {
	nonce.to_string()
}

impl LedgerState {
	/// Parses a ledger file. Signer keys are renormalized to checksum form;
	/// keys that are not addresses are dropped with a warning.
	pub fn from_json(bytes: &[u8]) -> Result<Self, StorageError> {
		let raw: BTreeMap<String, BTreeMap<String, NonceEntry>> = serde_json::from_slice(bytes)
			.map_err(|e| StorageError::Serialization(e.to_string()))?;

		let mut entries: BTreeMap<String, BTreeMap<String, NonceEntry>> = BTreeMap::new();
		for (signer, nonces) in raw {
			match parse_address(&signer) {
				Ok(addr) => entries.entry(signer_key(&addr)).or_default().extend(nonces),
				Err(_) => warn!(signer = %signer, "Dropping ledger entries for invalid signer key"),
			}
		}
		Ok(Self { entries })
	}

	pub fn to_json(&self) -> Result<Vec<u8>, StorageError> {
		serde_json::to_vec_pretty(&self.entries)
			.map_err(|e| StorageError::Serialization(e.to_string()))
	}

	/// Drops reserved entries whose timestamp is more than `ttl` before `now_ms`.
	/// Returns the number of entries removed.
	pub fn collect_garbage(&mut self, now_ms: u64, ttl: Duration) -> usize {
		let ttl_ms = ttl.as_millis() as u64;
		let mut removed = 0;
		self.entries.retain(|_, nonces| {
			nonces.retain(|_, entry| {
				let expired = entry.status == NonceStatus::Reserved
					&& now_ms.saturating_sub(entry.ts) > ttl_ms;
				if expired {
					removed += 1;
				}
				!expired
			});
			!nonces.is_empty()
		});
		removed
	}

	pub fn get(&self, signer: &Address, nonce: &U256) -> Option<NonceEntry> {
		self.entries
			.get(&signer_key(signer))
			.and_then(|nonces| nonces.get(&nonce_key(nonce)))
			.copied()
	}

	/// Inserts a reserved entry if none exists. Returns whether one was inserted.
	pub fn reserve(&mut self, signer: &Address, nonce: &U256, now_ms: u64) -> bool {
		let nonces = self.entries.entry(signer_key(signer)).or_default();
		let key = nonce_key(nonce);
		if nonces.contains_key(&key) {
			return false;
		}
		nonces.insert(key, NonceEntry::reserved(now_ms));
		true
	}

	pub fn mark_used(&mut self, signer: &Address, nonce: &U256, now_ms: u64) {
		self.entries
			.entry(signer_key(signer))
			.or_default()
			.insert(nonce_key(nonce), NonceEntry::used(now_ms));
	}

	/// Total number of entries across all signers.
	pub fn len(&self) -> usize {
		self.entries.values().map(BTreeMap::len).sum()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}
}

/// Applies the minimum TTL.
pub(crate) fn clamp_ttl(ttl: Duration) -> Duration {
	ttl.max(MIN_NONCE_TTL)
}
